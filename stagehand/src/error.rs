//! Error types for content updates.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::transfer::TransferStatus;

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while transferring and promoting content.
///
/// Every variant except [`UpdateError::ExtractionFailed`] is fatal for the
/// update that produced it. Extraction failures are logged and recorded on the
/// [`UpdateReport`](crate::engine::UpdateReport) while completion proceeds.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The staging or final directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreation { path: PathBuf, source: io::Error },

    /// A network fetch or local copy did not complete.
    #[error("failed to transfer {locator}: {reason}")]
    TransferFailed { locator: String, reason: String },

    /// A network fetch did not finish within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Staged content did not match its expected digest.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The copy tool exited with a code outside its success ranges.
    #[error("copy tool failed ({}): {detail}", describe_code(.code))]
    CopyToolFailure { code: Option<i32>, detail: String },

    /// An archive could not be unpacked after promotion.
    #[error("failed to extract {}: {reason}", .path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// Two units of one transfer set resolve to the same final path.
    #[error("duplicate destination {}", .path.display())]
    DuplicateDestination { path: PathBuf },

    /// A staged file could not be moved into its live location.
    #[error("failed to promote {} to {}: {source}", .from.display(), .to.display())]
    PromotionFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// A unit was asked to make an illegal status change.
    #[error("invalid transition for {}: {from} -> {to}", .path.display())]
    InvalidTransition {
        path: PathBuf,
        from: TransferStatus,
        to: TransferStatus,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// A source locator has no usable file name.
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// Another update is already running on the same engine.
    #[error("an update is already in progress on this engine")]
    UpdateInProgress,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

impl UpdateError {
    /// Shorthand for a [`UpdateError::TransferFailed`] with any displayable reason.
    pub(crate) fn transfer(locator: impl ToString, reason: impl ToString) -> Self {
        Self::TransferFailed {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error belongs to the transfer family (fetch, copy, verification).
    pub fn is_transfer_failure(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::Timeout { .. } | Self::ChecksumMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_tool_failure_display_with_code() {
        let err = UpdateError::CopyToolFailure {
            code: Some(16),
            detail: "robocopy".to_string(),
        };
        assert_eq!(err.to_string(), "copy tool failed (exit code 16): robocopy");
    }

    #[test]
    fn test_copy_tool_failure_display_without_code() {
        let err = UpdateError::CopyToolFailure {
            code: None,
            detail: "terminated by signal".to_string(),
        };
        assert!(err.to_string().contains("no exit code"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = UpdateError::ChecksumMismatch {
            filename: "app.zip".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[test]
    fn test_transfer_family() {
        assert!(UpdateError::transfer("http://a/b", "reset").is_transfer_failure());
        assert!(UpdateError::Timeout {
            url: "http://a".to_string(),
            timeout_secs: 5
        }
        .is_transfer_failure());
        assert!(!UpdateError::UpdateInProgress.is_transfer_failure());
    }
}
