//! In-process mirror for hosts without an external copy tool.

use std::fs;
use std::io;
use std::path::Path;

use futures::future::BoxFuture;
use glob::Pattern;
use tracing::debug;

use super::outcome::CopyOutcome;
use super::{CopyBridge, CopyRequest};

/// Mirrors matching top-level files with `std::fs`.
///
/// A file is copied when the destination is missing, differs in size, or is
/// older than the source. The source modification time is carried over so a
/// repeated mirror reports [`CopyOutcome::NoChange`].
#[derive(Debug, Default, Clone)]
pub struct NativeCopyBridge;

impl NativeCopyBridge {
    pub fn new() -> Self {
        Self
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, glob::PatternError> {
    patterns.iter().map(|p| Pattern::new(p)).collect()
}

fn needs_copy(source: &fs::Metadata, dest: &Path) -> io::Result<bool> {
    let dest = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };

    if dest.len() != source.len() {
        return Ok(true);
    }
    Ok(dest.modified()? < source.modified()?)
}

/// Copy matching files, returning how many were copied.
fn mirror_blocking(request: &CopyRequest) -> io::Result<usize> {
    let patterns = compile_patterns(&request.patterns)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    fs::create_dir_all(&request.dest_dir)?;

    let mut copied = 0;
    for entry in fs::read_dir(&request.source_dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        let wanted = request.files.iter().any(|f| f.as_str() == name.as_ref())
            || patterns.iter().any(|p| p.matches(&name));
        if !wanted {
            continue;
        }

        let dest = request.dest_dir.join(name.as_ref());
        if !needs_copy(&meta, &dest)? {
            continue;
        }

        fs::copy(entry.path(), &dest)?;
        fs::File::options()
            .write(true)
            .open(&dest)?
            .set_modified(meta.modified()?)?;
        debug!(file = %name, "Mirrored file");
        copied += 1;
    }

    Ok(copied)
}

impl CopyBridge for NativeCopyBridge {
    fn mirror<'a>(&'a self, request: &'a CopyRequest) -> BoxFuture<'a, CopyOutcome> {
        Box::pin(async move {
            let owned = request.clone();
            let result = tokio::task::spawn_blocking(move || mirror_blocking(&owned)).await;

            match result {
                Ok(Ok(0)) => CopyOutcome::NoChange,
                Ok(Ok(_)) => CopyOutcome::Copied,
                Ok(Err(e)) => CopyOutcome::ToolFailure {
                    code: None,
                    detail: format!(
                        "mirror {} -> {} failed: {}",
                        request.source_dir.display(),
                        request.dest_dir.display(),
                        e
                    ),
                },
                Err(e) => CopyOutcome::ToolFailure {
                    code: None,
                    detail: format!("mirror task failed: {}", e),
                },
            }
        })
    }
}
