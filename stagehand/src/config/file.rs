//! INI configuration file.
//!
//! ```ini
//! [updater]
//! remote = http://builds.example.com/app.zip
//! local = ../app/
//! temp = ../app.tmp/
//! keep_archive = false
//!
//! [network]
//! ; seconds, 0 disables the timeout
//! timeout = 300
//! parallel = 4
//!
//! [copy]
//! ; robocopy, rsync or native
//! tool = rsync
//! program = /usr/bin/rsync
//!
//! [logging]
//! level = info
//! directory = logs
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use super::engine::{
    CopyTool, CopyToolConfig, EngineConfig, DEFAULT_FINAL_DIR, DEFAULT_MAX_CONCURRENT_TRANSFERS,
    DEFAULT_STAGING_DIR,
};
use crate::fetch::DEFAULT_TIMEOUT_SECS;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

/// `[updater]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterSection {
    pub remote: Option<String>,
    pub local: PathBuf,
    pub temp: PathBuf,
    pub keep_archive: bool,
}

impl Default for UpdaterSection {
    fn default() -> Self {
        Self {
            remote: None,
            local: PathBuf::from(DEFAULT_FINAL_DIR),
            temp: PathBuf::from(DEFAULT_STAGING_DIR),
            keep_archive: false,
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSection {
    /// Timeout in seconds; 0 disables it.
    pub timeout: u64,
    pub parallel: usize,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            parallel: DEFAULT_MAX_CONCURRENT_TRANSFERS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSection {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Parsed configuration file with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub updater: UpdaterSection,
    pub network: NetworkSection,
    pub copy: CopyToolConfig,
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Default location: `<config dir>/stagehand/config.ini`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("stagehand").join("config.ini"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, falling back to defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("updater")) {
            config.updater.remote = section.get("remote").map(str::to_string);
            if let Some(local) = section.get("local") {
                config.updater.local = PathBuf::from(local);
            }
            if let Some(temp) = section.get("temp") {
                config.updater.temp = PathBuf::from(temp);
            }
            if let Some(keep) = parse_value::<bool>(section, "updater", "keep_archive")? {
                config.updater.keep_archive = keep;
            }
        }

        if let Some(section) = ini.section(Some("network")) {
            if let Some(timeout) = parse_value::<u64>(section, "network", "timeout")? {
                config.network.timeout = timeout;
            }
            if let Some(parallel) = parse_value::<usize>(section, "network", "parallel")? {
                config.network.parallel = parallel.max(1);
            }
        }

        if let Some(section) = ini.section(Some("copy")) {
            if let Some(tool) = parse_value::<CopyTool>(section, "copy", "tool")? {
                config.copy.tool = tool;
            }
            config.copy.program = section.get("program").map(PathBuf::from);
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = section.get("level") {
                config.logging.level = level.to_string();
            }
            config.logging.directory = section.get("directory").map(PathBuf::from);
        }

        Ok(config)
    }

    /// Build an engine configuration. An explicit `remote` overrides the file.
    pub fn to_engine_config(&self, remote: Option<String>) -> EngineConfig {
        let timeout = match self.network.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        EngineConfig::new(
            remote
                .or_else(|| self.updater.remote.clone())
                .unwrap_or_default(),
            self.updater.local.clone(),
        )
        .with_staging_dir(self.updater.temp.clone())
        .with_timeout(timeout)
        .with_max_concurrent_transfers(self.network.parallel)
        .with_keep_archive(self.updater.keep_archive)
        .with_copy_tool(self.copy.clone())
    }
}

fn parse_value<T>(section: &Properties, name: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    section
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    section: name.to_string(),
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ConfigFile::parse("").unwrap();
        assert_eq!(config.updater.local, PathBuf::from("../app/"));
        assert_eq!(config.updater.temp, PathBuf::from("../app.tmp/"));
        assert_eq!(config.network.timeout, 300);
        assert_eq!(config.network.parallel, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_file() {
        let config = ConfigFile::parse(
            "[updater]\n\
             remote = http://builds.example.com/app.zip\n\
             local = /srv/app\n\
             temp = /srv/app.tmp\n\
             keep_archive = true\n\
             [network]\n\
             timeout = 0\n\
             parallel = 8\n\
             [copy]\n\
             tool = native\n\
             [logging]\n\
             level = debug\n\
             directory = /var/log/stagehand\n",
        )
        .unwrap();

        assert_eq!(
            config.updater.remote.as_deref(),
            Some("http://builds.example.com/app.zip")
        );
        assert!(config.updater.keep_archive);
        assert_eq!(config.copy.tool, CopyTool::Native);
        assert_eq!(
            config.logging.directory,
            Some(PathBuf::from("/var/log/stagehand"))
        );

        let engine = config.to_engine_config(None);
        assert_eq!(engine.remote, "http://builds.example.com/app.zip");
        assert_eq!(engine.final_dir, PathBuf::from("/srv/app"));
        assert_eq!(engine.staging_dir, PathBuf::from("/srv/app.tmp"));
        assert_eq!(engine.fetch_timeout, None);
        assert_eq!(engine.max_concurrent_transfers, 8);
        assert!(engine.keep_archive);
    }

    #[test]
    fn test_cli_remote_overrides_file() {
        let config = ConfigFile::parse("[updater]\nremote = /mnt/builds/app.zip\n").unwrap();
        let engine = config.to_engine_config(Some("http://other/app.zip".to_string()));
        assert_eq!(engine.remote, "http://other/app.zip");
    }

    #[test]
    fn test_invalid_value_reported() {
        let err = ConfigFile::parse("[network]\nparallel = many\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "parallel"));
    }

    #[test]
    fn test_unknown_copy_tool_reported() {
        let err = ConfigFile::parse("[copy]\ntool = xcopy\n").unwrap_err();
        assert!(err.to_string().contains("xcopy"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[network]\ntimeout = 60\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.network.timeout, 60);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = ConfigFile::load_from(Path::new("/nonexistent/config.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
