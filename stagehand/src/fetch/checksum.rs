//! SHA-256 checksum calculation for staged file verification.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{UpdateError, UpdateResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate SHA-256 checksum of a file.
///
/// Returns the lowercase hexadecimal digest of the file contents.
pub fn calculate_file_checksum(path: &Path) -> UpdateResult<String> {
    let read_failed = |e: std::io::Error| UpdateError::transfer(path.display(), e);

    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_failed)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected checksum.
pub fn verify_checksum(path: &Path, expected: &str) -> UpdateResult<()> {
    let actual = calculate_file_checksum(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(UpdateError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
