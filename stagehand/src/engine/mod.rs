//! Update engines.
//!
//! An engine turns a configured source into a promoted set of files:
//!
//! ```text
//! ┌────────────┐  build set  ┌─────────────┐  fetch/copy  ┌─────────┐  rename  ┌───────┐
//! │ EngineConf │ ──────────► │ TransferSet │ ───────────► │ staging │ ───────► │ final │
//! └────────────┘             └─────────────┘              └─────────┘          └───────┘
//! ```
//!
//! [`ContentUpdateEngine`] promotes a list of named files.
//! [`PackageUpdateEngine`] promotes a single file and, if it is an archive,
//! extracts it into the live directory.

mod content;
mod guard;
mod package;
mod promote;

pub use content::ContentUpdateEngine;
pub use package::PackageUpdateEngine;

use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::copy::CopyOutcome;
use crate::error::{UpdateError, UpdateResult};
use crate::transfer::{TransferMode, TransferUnit};

/// Summary of one completed update.
#[derive(Debug)]
pub struct UpdateReport {
    /// How the source was reached.
    pub mode: TransferMode,

    /// Live paths written by this update, in promotion order.
    pub promoted: Vec<PathBuf>,

    /// Copy bridge verdict, for local sources.
    pub copy_outcome: Option<CopyOutcome>,

    /// Files written by package extraction.
    pub extracted_files: Option<usize>,

    /// Extraction failure. The update itself still succeeded and the
    /// archive is left in place.
    pub extraction_error: Option<UpdateError>,

    /// The package archive was deleted after extraction.
    pub archive_removed: bool,
}

impl UpdateReport {
    pub(crate) fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            promoted: Vec::new(),
            copy_outcome: None,
            extracted_files: None,
            extraction_error: None,
            archive_removed: false,
        }
    }

    /// Number of files promoted.
    pub fn promoted_count(&self) -> usize {
        self.promoted.len()
    }

    /// True when the copy bridge found nothing to do.
    pub fn is_no_change(&self) -> bool {
        matches!(self.copy_outcome, Some(CopyOutcome::NoChange))
    }
}

/// Notified once per unit when it reaches the live directory.
pub trait TransferListener: Send + Sync {
    fn loaded(&self, unit: &TransferUnit);
}

/// Logs each promotion at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl TransferListener for LogListener {
    fn loaded(&self, unit: &TransferUnit) {
        tracing::info!(
            file = %unit.file_name(),
            path = %unit.final_path().display(),
            "Loaded"
        );
    }
}

impl<F> TransferListener for F
where
    F: Fn(&TransferUnit) + Send + Sync,
{
    fn loaded(&self, unit: &TransferUnit) {
        self(unit)
    }
}

/// Common interface of the content and package engines.
///
/// Each call rebuilds its transfer set from configuration, so an engine can
/// be run repeatedly. Overlapping calls on one instance are rejected with
/// [`UpdateError::UpdateInProgress`].
pub trait UpdateEngine: Send + Sync {
    /// Run one update to completion.
    fn update(&self) -> BoxFuture<'_, UpdateResult<UpdateReport>>;

    /// Run one update and hand its outcome to `callback` exactly once.
    fn update_with_callback<'a, F>(&'a self, callback: F) -> BoxFuture<'a, ()>
    where
        F: FnOnce(UpdateResult<UpdateReport>) + Send + 'a,
        Self: Sized,
    {
        Box::pin(async move {
            let outcome = self.update().await;
            callback(outcome);
        })
    }
}
