//! Engine configuration and the INI configuration file.

mod engine;
mod file;

pub use engine::{
    CopyTool, CopyToolConfig, EngineConfig, DEFAULT_FINAL_DIR, DEFAULT_MAX_CONCURRENT_TRANSFERS,
    DEFAULT_STAGING_DIR,
};
pub use file::{ConfigError, ConfigFile, LoggingSection, NetworkSection, UpdaterSection};
