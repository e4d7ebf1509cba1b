//! Archive detection and extraction for package updates.
//!
//! This module handles:
//! - Recognizing archive types by extension (case-insensitive)
//! - Extracting zip, tar and tar.gz archives in place
//! - Counting extracted files for reporting

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{UpdateError, UpdateResult};

/// Archive formats the package engine knows how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from a file name, ignoring case.
    ///
    /// Returns `None` for anything that should be promoted as a plain file.
    pub fn detect(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Detect the format of a path's file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::detect)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
            Self::Tar => "tar",
        }
    }
}

/// Extract `archive` into `dest_dir`, returning the number of files written.
///
/// Entries whose paths would escape `dest_dir` are rejected by the
/// underlying readers. This is blocking; call it from `spawn_blocking`.
pub fn extract(archive: &Path, format: ArchiveFormat, dest_dir: &Path) -> UpdateResult<usize> {
    let failed = |reason: String| UpdateError::ExtractionFailed {
        path: archive.to_path_buf(),
        reason,
    };

    fs::create_dir_all(dest_dir)
        .map_err(|e| failed(format!("cannot create {}: {}", dest_dir.display(), e)))?;

    let file = File::open(archive).map_err(|e| failed(format!("open failed: {}", e)))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(reader)
                .map_err(|e| failed(format!("invalid zip: {}", e)))?;
            let count = (0..zip.len())
                .filter(|&i| zip.by_index_raw(i).map(|f| f.is_file()).unwrap_or(false))
                .count();
            zip.extract(dest_dir)
                .map_err(|e| failed(format!("zip extraction failed: {}", e)))?;
            Ok(count)
        }
        ArchiveFormat::TarGz => unpack_tar(tar::Archive::new(GzDecoder::new(reader)), dest_dir)
            .map_err(|e| failed(format!("tar.gz extraction failed: {}", e))),
        ArchiveFormat::Tar => unpack_tar(tar::Archive::new(reader), dest_dir)
            .map_err(|e| failed(format!("tar extraction failed: {}", e))),
    }
}

fn unpack_tar<R: std::io::Read>(
    mut archive: tar::Archive<R>,
    dest_dir: &Path,
) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();
        // unpack_in refuses paths outside dest_dir and reports them as false.
        if entry.unpack_in(dest_dir)? && is_file {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(ArchiveFormat::detect("app.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("APP.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::detect("app.Tar.Gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("app.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::detect("app.tar"), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::detect("notes.txt"), None);
        assert_eq!(ArchiveFormat::detect("zip"), None);
    }

    #[test]
    fn test_extract_zip_with_nested_entries() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.zip");
        fs::write(
            &archive,
            zip_bytes(&[("a.txt", b"alpha"), ("b/c.txt", b"charlie")]),
        )
        .unwrap();

        let count = extract(&archive, ArchiveFormat::Zip, temp.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(temp.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(temp.path().join("b/c.txt")).unwrap(), b"charlie");
    }

    #[test]
    fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.tar.gz");

        let encoder = flate2::write::GzEncoder::new(
            File::create(&archive).unwrap(),
            flate2::Compression::default(),
        );
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "dir/file.txt", &b"hello"[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let out = temp.path().join("out");
        let count = extract(&archive, ArchiveFormat::TarGz, &out).unwrap();

        assert_eq!(count, 1);
        assert_eq!(fs::read(out.join("dir/file.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_corrupt_zip_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip file").unwrap();

        let err = extract(&archive, ArchiveFormat::Zip, temp.path()).unwrap_err();
        assert!(matches!(err, UpdateError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_missing_archive_fails() {
        let temp = TempDir::new().unwrap();
        let err = extract(
            &temp.path().join("missing.zip"),
            ArchiveFormat::Zip,
            temp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_unusable_destination_is_extraction_failure() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.zip");
        fs::write(&archive, b"unused").unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        let err = extract(&archive, ArchiveFormat::Zip, &blocker.join("out")).unwrap_err();
        assert!(matches!(err, UpdateError::ExtractionFailed { .. }));
    }
}
