//! Classification of copy tool exit codes.

use std::ops::RangeInclusive;

/// Result of one mirror operation.
///
/// Raw exit codes stop here; the engine only ever sees one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Nothing needed copying.
    NoChange,
    /// At least one file was copied into the destination.
    Copied,
    /// The tool failed, could not be started, or was killed.
    ToolFailure { code: Option<i32>, detail: String },
}

impl CopyOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ToolFailure { .. })
    }
}

/// Exit code ranges that mean "nothing to copy" and "files copied".
///
/// Mirroring tools overload their exit status as a bitmask of change
/// categories, so zero is not necessarily the only success value. Any code
/// outside both ranges is a tool failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodePolicy {
    no_change: Option<RangeInclusive<i32>>,
    copied: RangeInclusive<i32>,
}

impl ExitCodePolicy {
    /// Create a policy from explicit ranges.
    pub fn new(no_change: Option<RangeInclusive<i32>>, copied: RangeInclusive<i32>) -> Self {
        Self { no_change, copied }
    }

    /// Robocopy: 0 means no files copied, 1 through 8 mean files were copied
    /// (possibly with extra or mismatched files reported), 9 and above are
    /// failures.
    pub fn robocopy() -> Self {
        Self::new(Some(0..=0), 1..=8)
    }

    /// Rsync: 0 is success and does not distinguish "nothing to do".
    pub fn rsync() -> Self {
        Self::new(None, 0..=0)
    }

    /// Classify a process exit code. `None` means the process was terminated
    /// without an exit code.
    pub fn classify(&self, code: Option<i32>, tool: &str) -> CopyOutcome {
        let Some(code) = code else {
            return CopyOutcome::ToolFailure {
                code: None,
                detail: format!("{} terminated without an exit code", tool),
            };
        };

        if self.no_change.as_ref().is_some_and(|r| r.contains(&code)) {
            CopyOutcome::NoChange
        } else if self.copied.contains(&code) {
            CopyOutcome::Copied
        } else {
            CopyOutcome::ToolFailure {
                code: Some(code),
                detail: format!("{} exited with unrecognized code {}", tool, code),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robocopy_ranges() {
        let policy = ExitCodePolicy::robocopy();
        assert_eq!(policy.classify(Some(0), "robocopy"), CopyOutcome::NoChange);
        for code in 1..=8 {
            assert_eq!(policy.classify(Some(code), "robocopy"), CopyOutcome::Copied);
        }
        assert!(policy.classify(Some(9), "robocopy").is_failure());
        assert!(policy.classify(Some(16), "robocopy").is_failure());
        assert!(policy.classify(Some(-1), "robocopy").is_failure());
    }

    #[test]
    fn test_rsync_has_no_no_change_code() {
        let policy = ExitCodePolicy::rsync();
        assert_eq!(policy.classify(Some(0), "rsync"), CopyOutcome::Copied);
        assert!(policy.classify(Some(23), "rsync").is_failure());
    }

    #[test]
    fn test_missing_code_is_failure() {
        let outcome = ExitCodePolicy::robocopy().classify(None, "robocopy");
        assert_eq!(
            outcome,
            CopyOutcome::ToolFailure {
                code: None,
                detail: "robocopy terminated without an exit code".to_string(),
            }
        );
    }

    #[test]
    fn test_custom_ranges() {
        let policy = ExitCodePolicy::new(Some(10..=10), 20..=29);
        assert_eq!(policy.classify(Some(10), "tool"), CopyOutcome::NoChange);
        assert_eq!(policy.classify(Some(25), "tool"), CopyOutcome::Copied);
        assert_eq!(
            policy.classify(Some(0), "tool"),
            CopyOutcome::ToolFailure {
                code: Some(0),
                detail: "tool exited with unrecognized code 0".to_string(),
            }
        );
    }
}
