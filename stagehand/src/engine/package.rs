//! Single-package updates with archive extraction.

use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{error, info, warn};

use super::content::ContentUpdateEngine;
use super::guard::UpdateGuard;
use super::{TransferListener, UpdateEngine, UpdateReport};
use crate::archive::{self, ArchiveFormat};
use crate::config::EngineConfig;
use crate::copy::{CopyBridge, CopyOutcome};
use crate::error::{UpdateError, UpdateResult};
use crate::fetch::Fetcher;
use crate::transfer::{SourceLocator, TransferSet, TransferStatus, TransferUnit};

/// Promotes one package file and unpacks it if it is an archive.
///
/// `config.remote` names the package itself. After promotion a zip, tar or
/// tar.gz package is extracted into the live directory and then deleted
/// unless `keep_archive` is set. A failed extraction is logged and recorded
/// in the report; the promoted archive stays in place and the update still
/// succeeds.
pub struct PackageUpdateEngine {
    base: ContentUpdateEngine,
    expected_sha256: Option<String>,
    guard: UpdateGuard,
}

impl PackageUpdateEngine {
    pub fn new(config: EngineConfig) -> UpdateResult<Self> {
        Ok(Self {
            base: ContentUpdateEngine::new(config, Vec::<String>::new())?,
            expected_sha256: None,
            guard: UpdateGuard::default(),
        })
    }

    /// Require the package to match a SHA-256 digest before promotion.
    pub fn with_expected_sha256(mut self, digest: impl Into<String>) -> Self {
        self.expected_sha256 = Some(digest.into());
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.base = self.base.with_fetcher(fetcher);
        self
    }

    pub fn with_copy_bridge(mut self, copier: Arc<dyn CopyBridge>) -> Self {
        self.base = self.base.with_copy_bridge(copier);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.base = self.base.with_listener(listener);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.base.config()
    }

    pub fn is_updating(&self) -> bool {
        self.guard.is_running()
    }

    async fn run(&self) -> UpdateResult<UpdateReport> {
        let _token = self.guard.acquire()?;
        let config = self.base.config();

        let package = SourceLocator::parse(&config.remote)?;
        if package.file_name().is_none() {
            return Err(UpdateError::InvalidLocator(format!(
                "{} does not name a package file",
                package
            )));
        }
        let root = package.parent()?;
        let mut set = TransferSet::single(package, &config.staging_dir, &config.final_dir)?;
        if let (Some(digest), Some(unit)) = (&self.expected_sha256, set.get_mut(0)) {
            unit.set_expected_sha256(digest.as_str());
        }

        let mut report = self.base.run_set(&root, &mut set).await?;

        if matches!(report.copy_outcome, Some(CopyOutcome::NoChange)) {
            info!("Package unchanged, skipping extraction");
            return Ok(report);
        }

        if let Some(unit) = set
            .all()
            .first()
            .filter(|u| u.status() == TransferStatus::Promoted)
        {
            self.unpack(unit, &mut report).await;
        }

        info!(
            promoted = report.promoted_count(),
            extracted = report.extracted_files.unwrap_or(0),
            "Package update complete"
        );
        Ok(report)
    }

    async fn unpack(&self, unit: &TransferUnit, report: &mut UpdateReport) {
        let archive_path = unit.final_path().to_path_buf();
        let Some(format) = ArchiveFormat::from_path(&archive_path) else {
            info!(file = %unit.file_name(), "Package is not an archive");
            return;
        };

        let dest = archive_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base.config().final_dir.clone());

        info!(
            archive = %archive_path.display(),
            format = format.name(),
            "Extracting package"
        );

        let path = archive_path.clone();
        let target = dest.clone();
        let extracted =
            tokio::task::spawn_blocking(move || archive::extract(&path, format, &target))
                .await
                .map_err(|e| UpdateError::ExtractionFailed {
                    path: archive_path.clone(),
                    reason: e.to_string(),
                })
                .and_then(|result| result);

        match extracted {
            Ok(count) => {
                info!(files = count, dest = %dest.display(), "Extracted package");
                report.extracted_files = Some(count);
                if self.base.config().keep_archive {
                    return;
                }
                match tokio::fs::remove_file(&archive_path).await {
                    Ok(()) => report.archive_removed = true,
                    Err(e) => warn!(
                        archive = %archive_path.display(),
                        error = %e,
                        "Failed to remove package archive"
                    ),
                }
            }
            Err(e) => {
                error!(
                    archive = %archive_path.display(),
                    error = %e,
                    "Package extraction failed"
                );
                report.extraction_error = Some(e);
            }
        }
    }
}

impl UpdateEngine for PackageUpdateEngine {
    fn update(&self) -> BoxFuture<'_, UpdateResult<UpdateReport>> {
        Box::pin(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CopyTool, CopyToolConfig};
    use crate::copy::CopyRequest;
    use reqwest::Url;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Serves fixed bytes for every URL.
    struct BytesFetcher {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl BytesFetcher {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for BytesFetcher {
        fn fetch<'a>(&'a self, _url: &'a Url, dest: &'a Path) -> BoxFuture<'a, UpdateResult<u64>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::fs::write(dest, &self.body).await.unwrap();
                Ok(self.body.len() as u64)
            })
        }
    }

    struct FixedBridge(CopyOutcome);

    impl CopyBridge for FixedBridge {
        fn mirror<'a>(&'a self, _request: &'a CopyRequest) -> BoxFuture<'a, CopyOutcome> {
            Box::pin(async move { self.0.clone() })
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn config(temp: &TempDir, remote: &str) -> EngineConfig {
        EngineConfig::new(remote, temp.path().join("live"))
            .with_staging_dir(temp.path().join("staging"))
            .with_copy_tool(CopyToolConfig::new(CopyTool::Native))
    }

    #[tokio::test]
    async fn test_zip_package_extracted_and_removed() {
        let temp = TempDir::new().unwrap();
        let engine = PackageUpdateEngine::new(config(&temp, "http://builds.example.com/app.zip"))
            .unwrap()
            .with_fetcher(Arc::new(BytesFetcher::new(zip_bytes(&[
                ("index.html", "<html>"),
                ("js/app.js", "run()"),
            ]))));

        let report = engine.update().await.unwrap();

        assert_eq!(report.promoted_count(), 1);
        assert_eq!(report.extracted_files, Some(2));
        assert!(report.archive_removed);
        assert!(report.extraction_error.is_none());
        assert!(!temp.path().join("live/app.zip").exists());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("live/js/app.js")).unwrap(),
            "run()"
        );
    }

    #[tokio::test]
    async fn test_keep_archive() {
        let temp = TempDir::new().unwrap();
        let engine = PackageUpdateEngine::new(
            config(&temp, "http://builds.example.com/app.zip").with_keep_archive(true),
        )
        .unwrap()
        .with_fetcher(Arc::new(BytesFetcher::new(zip_bytes(&[("a.txt", "A")]))));

        let report = engine.update().await.unwrap();

        assert_eq!(report.extracted_files, Some(1));
        assert!(!report.archive_removed);
        assert!(temp.path().join("live/app.zip").exists());
        assert!(temp.path().join("live/a.txt").exists());
    }

    #[tokio::test]
    async fn test_plain_file_not_extracted() {
        let temp = TempDir::new().unwrap();
        let engine =
            PackageUpdateEngine::new(config(&temp, "http://builds.example.com/notes.txt"))
                .unwrap()
                .with_fetcher(Arc::new(BytesFetcher::new(b"release notes".to_vec())));

        let report = engine.update().await.unwrap();

        assert_eq!(report.promoted_count(), 1);
        assert_eq!(report.extracted_files, None);
        assert!(temp.path().join("live/notes.txt").exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive_reported_not_failed() {
        let temp = TempDir::new().unwrap();
        let engine = PackageUpdateEngine::new(config(&temp, "http://builds.example.com/app.zip"))
            .unwrap()
            .with_fetcher(Arc::new(BytesFetcher::new(b"not a zip".to_vec())));

        let report = engine.update().await.unwrap();

        assert!(matches!(
            report.extraction_error,
            Some(UpdateError::ExtractionFailed { .. })
        ));
        assert!(!report.archive_removed);
        assert!(temp.path().join("live/app.zip").exists());
    }

    #[tokio::test]
    async fn test_no_change_skips_extraction() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("builds");
        std::fs::create_dir_all(&source).unwrap();

        let engine = PackageUpdateEngine::new(config(
            &temp,
            &source.join("app.zip").to_string_lossy(),
        ))
        .unwrap()
        .with_copy_bridge(Arc::new(FixedBridge(CopyOutcome::NoChange)));

        let report = engine.update().await.unwrap();

        assert!(report.is_no_change());
        assert_eq!(report.extracted_files, None);
    }

    #[tokio::test]
    async fn test_local_package_extracted() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("builds");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("app.zip"), zip_bytes(&[("a.txt", "A")])).unwrap();

        let engine = PackageUpdateEngine::new(config(
            &temp,
            &source.join("app.zip").to_string_lossy(),
        ))
        .unwrap();

        let report = engine.update().await.unwrap();

        assert_eq!(report.extracted_files, Some(1));
        assert_eq!(
            std::fs::read_to_string(temp.path().join("live/a.txt")).unwrap(),
            "A"
        );
    }

    #[tokio::test]
    async fn test_package_digest_mismatch_fails() {
        let temp = TempDir::new().unwrap();
        let engine = PackageUpdateEngine::new(config(&temp, "http://builds.example.com/app.zip"))
            .unwrap()
            .with_fetcher(Arc::new(BytesFetcher::new(zip_bytes(&[("a.txt", "A")]))))
            .with_expected_sha256("ABCDEF");

        let err = engine.update().await.unwrap_err();

        assert!(matches!(err, UpdateError::ChecksumMismatch { .. }));
        assert!(!temp.path().join("live/app.zip").exists());
        assert!(!temp.path().join("live/a.txt").exists());
    }

    #[tokio::test]
    async fn test_remote_without_file_name_rejected() {
        let temp = TempDir::new().unwrap();
        let engine = PackageUpdateEngine::new(config(&temp, "http://builds.example.com/"))
            .unwrap();

        let err = engine.update().await.unwrap_err();
        assert!(matches!(err, UpdateError::InvalidLocator(_)));
    }
}
