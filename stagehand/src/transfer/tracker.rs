//! Aggregate completion state for one transfer set.

use crate::error::UpdateError;

/// Counts outstanding units and holds the first failure.
///
/// Each unit resolves exactly once. The first failure is sticky: later
/// failures are dropped, and later successes no longer matter because the
/// update has already short-circuited.
#[derive(Debug)]
pub struct CompletionTracker {
    outstanding: usize,
    resolved: usize,
    failure: Option<UpdateError>,
}

/// What the aggregating loop should do after a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More units are outstanding.
    Pending,
    /// Every unit resolved successfully.
    Completed,
    /// A unit failed; stop waiting for the rest.
    Failed,
}

impl CompletionTracker {
    /// Track `outstanding` units.
    pub fn new(outstanding: usize) -> Self {
        Self {
            outstanding,
            resolved: 0,
            failure: None,
        }
    }

    /// Record a successful resolution.
    pub fn resolve_success(&mut self) -> Progress {
        if self.failure.is_some() {
            return Progress::Failed;
        }
        self.resolve();
        self.progress()
    }

    /// Record a failed resolution. Only the first failure is kept.
    pub fn resolve_failure(&mut self, error: UpdateError) -> Progress {
        self.resolve();
        if self.failure.is_none() {
            self.failure = Some(error);
        }
        Progress::Failed
    }

    fn resolve(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.resolved += 1;
    }

    /// Current aggregate state.
    pub fn progress(&self) -> Progress {
        if self.failure.is_some() {
            Progress::Failed
        } else if self.outstanding == 0 {
            Progress::Completed
        } else {
            Progress::Pending
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn resolved(&self) -> usize {
        self.resolved
    }

    /// Consume the tracker, yielding the first failure if any.
    pub fn into_result(self) -> Result<(), UpdateError> {
        match self.failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
