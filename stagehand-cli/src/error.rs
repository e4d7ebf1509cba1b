//! CLI error type.

use std::fmt;

use stagehand::config::ConfigError;
use stagehand::logging::LoggingError;
use stagehand::UpdateError;

/// Errors surfaced to the user by the `stagehand` binary.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be read or is invalid.
    Config(String),
    /// No remote source on the command line or in the config file.
    MissingRemote,
    /// Logging could not be set up.
    Logging(LoggingError),
    /// Async runtime could not be started.
    Runtime(std::io::Error),
    /// The update itself failed.
    Update(UpdateError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::MissingRemote => 2,
            CliError::Update(UpdateError::UpdateInProgress) => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::MissingRemote => write!(
                f,
                "No remote source given. Pass --remote or set remote in the [updater] section"
            ),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Update(e) => write!(f, "Update failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Update(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<UpdateError> for CliError {
    fn from(e: UpdateError) -> Self {
        CliError::Update(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::MissingRemote.exit_code(), 2);
        assert_eq!(CliError::Update(UpdateError::UpdateInProgress).exit_code(), 3);
        assert_eq!(
            CliError::Update(UpdateError::InvalidLocator("x".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_missing_remote_message() {
        assert!(CliError::MissingRemote.to_string().contains("--remote"));
    }
}
