//! Source locators: where a unit's bytes come from.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::error::{UpdateError, UpdateResult};

/// How content reaches the staging directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Streamed over HTTP(S) one unit at a time.
    Network,
    /// Mirrored from a local directory by the copy bridge in one batch.
    Local,
}

/// Either a network URI or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Url(Url),
    Path(PathBuf),
}

impl SourceLocator {
    /// Parse a configured locator string.
    ///
    /// `http://` and `https://` URIs select network mode. `file://` URIs are
    /// converted to paths; anything else is taken as a path verbatim.
    pub fn parse(raw: &str) -> UpdateResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UpdateError::InvalidLocator("empty locator".to_string()));
        }

        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Url(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Path)
                .map_err(|_| UpdateError::InvalidLocator(trimmed.to_string())),
            // Windows drive letters parse as a one-letter scheme.
            _ => Ok(Self::Path(PathBuf::from(trimmed))),
        }
    }

    /// The transfer mode implied by this locator.
    pub fn mode(&self) -> TransferMode {
        match self {
            Self::Url(_) => TransferMode::Network,
            Self::Path(_) => TransferMode::Local,
        }
    }

    /// The last path segment, used to name staged and final files.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            Self::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
        }
    }

    /// Resolve a file name relative to this locator treated as a directory.
    pub fn join(&self, name: &str) -> UpdateResult<Self> {
        match self {
            Self::Url(url) => {
                let mut base = url.clone();
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                base.join(name)
                    .map(Self::Url)
                    .map_err(|e| UpdateError::InvalidLocator(format!("{}{}: {}", url, name, e)))
            }
            Self::Path(path) => Ok(Self::Path(path.join(name))),
        }
    }

    /// The containing location, used when a locator names a single file.
    pub fn parent(&self) -> UpdateResult<Self> {
        match self {
            Self::Url(url) => url
                .join("./")
                .map(Self::Url)
                .map_err(|e| UpdateError::InvalidLocator(format!("{}: {}", url, e))),
            Self::Path(path) => Ok(Self::Path(
                path.parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf(),
            )),
        }
    }

    /// The local directory this locator names, if it is a path.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_is_network() {
        let locator = SourceLocator::parse("http://example.com/apps/app.zip").unwrap();
        assert_eq!(locator.mode(), TransferMode::Network);
        assert_eq!(locator.file_name().as_deref(), Some("app.zip"));
    }

    #[test]
    fn test_https_is_network() {
        let locator = SourceLocator::parse("https://example.com/app.zip").unwrap();
        assert_eq!(locator.mode(), TransferMode::Network);
    }

    #[test]
    fn test_plain_path_is_local() {
        let locator = SourceLocator::parse("/srv/builds/app.zip").unwrap();
        assert_eq!(locator.mode(), TransferMode::Local);
        assert_eq!(locator.file_name().as_deref(), Some("app.zip"));
    }

    #[test]
    fn test_relative_path_is_local() {
        let locator = SourceLocator::parse("../builds/app.exe").unwrap();
        assert_eq!(locator.mode(), TransferMode::Local);
        assert_eq!(
            locator.parent().unwrap(),
            SourceLocator::Path(PathBuf::from("../builds"))
        );
    }

    #[test]
    fn test_file_uri_is_local() {
        let locator = SourceLocator::parse("file:///srv/builds/app.zip").unwrap();
        assert_eq!(
            locator,
            SourceLocator::Path(PathBuf::from("/srv/builds/app.zip"))
        );
    }

    #[test]
    fn test_empty_locator_rejected() {
        assert!(matches!(
            SourceLocator::parse("  "),
            Err(UpdateError::InvalidLocator(_))
        ));
    }

    #[test]
    fn test_url_join_adds_trailing_slash() {
        let root = SourceLocator::parse("http://example.com/content").unwrap();
        let joined = root.join("movie.mp4").unwrap();
        assert_eq!(joined.to_string(), "http://example.com/content/movie.mp4");
    }

    #[test]
    fn test_url_parent() {
        let locator = SourceLocator::parse("http://example.com/apps/app.zip").unwrap();
        assert_eq!(
            locator.parent().unwrap().to_string(),
            "http://example.com/apps/"
        );
    }

    #[test]
    fn test_url_without_file_name() {
        let locator = SourceLocator::parse("http://example.com/").unwrap();
        assert_eq!(locator.file_name(), None);
    }

    #[test]
    fn test_bare_file_name_parent_is_current_dir() {
        let locator = SourceLocator::parse("app.zip").unwrap();
        assert_eq!(
            locator.parent().unwrap(),
            SourceLocator::Path(PathBuf::from("."))
        );
    }
}
