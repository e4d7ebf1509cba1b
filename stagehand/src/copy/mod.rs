//! Directory mirroring for local (non-network) sources.
//!
//! The engine never runs a copy tool itself. It hands a [`CopyRequest`] to a
//! [`CopyBridge`] and gets back a [`CopyOutcome`]:
//!
//! ```text
//! CopyBridge (trait)
//!     ├── ProcessCopyBridge   robocopy / rsync / custom command
//!     └── NativeCopyBridge    in-process std::fs mirror
//! ```
//!
//! Exit code thresholds belong to the bridge's [`ExitCodePolicy`], never to
//! the engine.

mod native;
mod outcome;
mod process;

pub use native::NativeCopyBridge;
pub use outcome::{CopyOutcome, ExitCodePolicy};
pub use process::{CopyToolKind, ProcessCopyBridge};

use std::path::PathBuf;

use futures::future::BoxFuture;

/// One batch mirror: every file in `source_dir` that matches one of
/// `patterns` or is named in `files` is copied into `dest_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Wildcard patterns, interpreted by the tool.
    pub patterns: Vec<String>,
    /// Exact file names. Wildcard characters in them are literal.
    pub files: Vec<String>,
}

impl CopyRequest {
    pub fn new(source_dir: PathBuf, dest_dir: PathBuf, patterns: Vec<String>) -> Self {
        Self {
            source_dir,
            dest_dir,
            patterns,
            files: Vec::new(),
        }
    }

    /// Mirror exactly the named files.
    pub fn for_files(source_dir: PathBuf, dest_dir: PathBuf, files: Vec<String>) -> Self {
        Self {
            source_dir,
            dest_dir,
            patterns: Vec::new(),
            files,
        }
    }
}

/// Adapter over a directory-mirroring utility.
///
/// Implementations must not panic on tool errors; every failure is reported
/// as [`CopyOutcome::ToolFailure`].
pub trait CopyBridge: Send + Sync {
    /// Mirror matching files and classify the result.
    fn mirror<'a>(&'a self, request: &'a CopyRequest) -> BoxFuture<'a, CopyOutcome>;
}
