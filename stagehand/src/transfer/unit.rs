//! A single file's journey from source to live location.

use std::fmt;
use std::path::{Path, PathBuf};

use super::locator::SourceLocator;
use crate::error::{UpdateError, UpdateResult};

/// Lifecycle of a transfer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    /// Not yet dispatched.
    Pending,
    /// Fetch or copy has been dispatched.
    InFlight,
    /// Complete, verified bytes sit at the staging path.
    Staged,
    /// Moved into the final path.
    Promoted,
    /// Transfer or promotion failed.
    Failed,
}

impl TransferStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Promoted | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        match (self, next) {
            (Pending, InFlight) | (InFlight, Staged) | (Staged, Promoted) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Get a human-readable name for the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in-flight",
            Self::Staged => "staged",
            Self::Promoted => "promoted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One file to be fetched or copied, staged, and promoted.
#[derive(Debug, Clone)]
pub struct TransferUnit {
    source: SourceLocator,
    staging_path: PathBuf,
    final_path: PathBuf,
    expected_sha256: Option<String>,
    status: TransferStatus,
}

impl TransferUnit {
    /// Create a unit named after the source's file name.
    ///
    /// The staging and final paths are `staging_dir/<name>` and
    /// `final_dir/<name>`.
    pub fn new(source: SourceLocator, staging_dir: &Path, final_dir: &Path) -> UpdateResult<Self> {
        let name = source
            .file_name()
            .ok_or_else(|| UpdateError::InvalidLocator(format!("{} has no file name", source)))?;

        Ok(Self {
            staging_path: staging_dir.join(&name),
            final_path: final_dir.join(&name),
            source,
            expected_sha256: None,
            status: TransferStatus::Pending,
        })
    }

    /// Require the staged content to hash to the given SHA-256 digest.
    pub fn with_expected_sha256(mut self, digest: impl Into<String>) -> Self {
        self.set_expected_sha256(digest);
        self
    }

    pub(crate) fn set_expected_sha256(&mut self, digest: impl Into<String>) {
        self.expected_sha256 = Some(digest.into().to_lowercase());
    }

    pub fn source(&self) -> &SourceLocator {
        &self.source
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn expected_sha256(&self) -> Option<&str> {
        self.expected_sha256.as_deref()
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// The file name shared by the staging and final paths.
    pub fn file_name(&self) -> String {
        self.final_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Move to the next status, rejecting illegal transitions.
    pub fn advance(&mut self, next: TransferStatus) -> UpdateResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(UpdateError::InvalidTransition {
                path: self.final_path.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Mark the unit failed unless it already reached a terminal state.
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = TransferStatus::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> TransferUnit {
        TransferUnit::new(
            SourceLocator::parse("http://example.com/app.zip").unwrap(),
            Path::new("/tmp/app.tmp"),
            Path::new("/srv/app"),
        )
        .unwrap()
    }

    #[test]
    fn test_paths_derived_from_basename() {
        let unit = unit();
        assert_eq!(unit.staging_path(), Path::new("/tmp/app.tmp/app.zip"));
        assert_eq!(unit.final_path(), Path::new("/srv/app/app.zip"));
        assert_eq!(unit.file_name(), "app.zip");
        assert_eq!(unit.status(), TransferStatus::Pending);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut unit = unit();
        unit.advance(TransferStatus::InFlight).unwrap();
        unit.advance(TransferStatus::Staged).unwrap();
        unit.advance(TransferStatus::Promoted).unwrap();
        assert_eq!(unit.status(), TransferStatus::Promoted);
    }

    #[test]
    fn test_pending_cannot_jump_to_promoted() {
        let mut unit = unit();
        let err = unit.advance(TransferStatus::Promoted).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::InvalidTransition {
                from: TransferStatus::Pending,
                to: TransferStatus::Promoted,
                ..
            }
        ));
        assert_eq!(unit.status(), TransferStatus::Pending);
    }

    #[test]
    fn test_in_flight_cannot_skip_staging() {
        let mut unit = unit();
        unit.advance(TransferStatus::InFlight).unwrap();
        assert!(unit.advance(TransferStatus::Promoted).is_err());
    }

    #[test]
    fn test_fail_is_sticky_but_not_after_promotion() {
        let mut failed = unit();
        failed.advance(TransferStatus::InFlight).unwrap();
        failed.fail();
        assert_eq!(failed.status(), TransferStatus::Failed);
        assert!(failed.advance(TransferStatus::Staged).is_err());

        let mut promoted = unit();
        promoted.advance(TransferStatus::InFlight).unwrap();
        promoted.advance(TransferStatus::Staged).unwrap();
        promoted.advance(TransferStatus::Promoted).unwrap();
        promoted.fail();
        assert_eq!(promoted.status(), TransferStatus::Promoted);
    }

    #[test]
    fn test_locator_without_name_rejected() {
        let result = TransferUnit::new(
            SourceLocator::parse("http://example.com/").unwrap(),
            Path::new("/tmp"),
            Path::new("/srv"),
        );
        assert!(matches!(result, Err(UpdateError::InvalidLocator(_))));
    }

    #[test]
    fn test_expected_digest_normalised() {
        let unit = unit().with_expected_sha256("ABCDEF");
        assert_eq!(unit.expected_sha256(), Some("abcdef"));
    }
}
