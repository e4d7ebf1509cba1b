//! Configuration consumed by the update engines.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::copy::{CopyBridge, NativeCopyBridge, ProcessCopyBridge};
use crate::fetch::DEFAULT_TIMEOUT_SECS;

/// Default live directory for application content.
pub const DEFAULT_FINAL_DIR: &str = "../app/";

/// Default staging directory for in-flight content.
pub const DEFAULT_STAGING_DIR: &str = "../app.tmp/";

/// Default number of concurrent network transfers.
pub const DEFAULT_MAX_CONCURRENT_TRANSFERS: usize = 4;

/// Which mirroring utility serves local sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTool {
    Robocopy,
    Rsync,
    /// In-process mirror, no external program.
    Native,
}

impl CopyTool {
    /// The platform's usual mirroring tool.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Robocopy
        } else {
            Self::Rsync
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Robocopy => "robocopy",
            Self::Rsync => "rsync",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for CopyTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CopyTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "robocopy" => Ok(Self::Robocopy),
            "rsync" => Ok(Self::Rsync),
            "native" => Ok(Self::Native),
            other => Err(format!(
                "unknown copy tool '{}' (expected robocopy, rsync or native)",
                other
            )),
        }
    }
}

/// Copy bridge selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyToolConfig {
    pub tool: CopyTool,
    /// Program path override; defaults to the tool's name on `PATH`.
    pub program: Option<PathBuf>,
}

impl Default for CopyToolConfig {
    fn default() -> Self {
        Self {
            tool: CopyTool::platform_default(),
            program: None,
        }
    }
}

impl CopyToolConfig {
    pub fn new(tool: CopyTool) -> Self {
        Self {
            tool,
            program: None,
        }
    }

    /// Instantiate the configured bridge.
    pub fn build_bridge(&self) -> Arc<dyn CopyBridge> {
        let process = match self.tool {
            CopyTool::Native => return Arc::new(NativeCopyBridge::new()),
            CopyTool::Robocopy => ProcessCopyBridge::robocopy(),
            CopyTool::Rsync => ProcessCopyBridge::rsync(),
        };
        match &self.program {
            Some(program) => Arc::new(process.with_program(program)),
            None => Arc::new(process),
        }
    }
}

/// Configuration for a content or package update engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Source of the update: an HTTP(S) URI or a local path.
    pub remote: String,

    /// Live directory that receives promoted content.
    pub final_dir: PathBuf,

    /// Directory holding content while it is in transit.
    pub staging_dir: PathBuf,

    /// Upper bound on a single network fetch. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,

    /// Maximum concurrent network fetches.
    pub max_concurrent_transfers: usize,

    /// Keep a package archive after successful extraction.
    pub keep_archive: bool,

    /// Mirroring tool for local sources.
    pub copy_tool: CopyToolConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote: String::new(),
            final_dir: PathBuf::from(DEFAULT_FINAL_DIR),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            fetch_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_concurrent_transfers: DEFAULT_MAX_CONCURRENT_TRANSFERS,
            keep_archive: false,
            copy_tool: CopyToolConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration for the given source and live directory.
    pub fn new(remote: impl Into<String>, final_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote: remote.into(),
            final_dir: final_dir.into(),
            ..Default::default()
        }
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = path.into();
        self
    }

    /// Set the fetch timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the maximum concurrent transfers (minimum 1).
    pub fn with_max_concurrent_transfers(mut self, max: usize) -> Self {
        self.max_concurrent_transfers = max.max(1);
        self
    }

    /// Keep or delete package archives after extraction.
    pub fn with_keep_archive(mut self, keep: bool) -> Self {
        self.keep_archive = keep;
        self
    }

    /// Select the copy tool for local sources.
    pub fn with_copy_tool(mut self, copy_tool: CopyToolConfig) -> Self {
        self.copy_tool = copy_tool;
        self
    }
}
