//! Multi-file content updates.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use super::guard::UpdateGuard;
use super::promote::{discard_staged, ensure_dir, promote};
use super::{LogListener, TransferListener, UpdateEngine, UpdateReport};
use crate::config::EngineConfig;
use crate::copy::{CopyBridge, CopyOutcome, CopyRequest};
use crate::error::{UpdateError, UpdateResult};
use crate::fetch::{verify_checksum, Fetcher, HttpFetcher};
use crate::transfer::{
    CompletionTracker, Progress, SourceLocator, TransferMode, TransferSet, TransferStatus,
    TransferUnit,
};

/// Promotes a list of named files from a remote directory.
///
/// Network sources are fetched concurrently, bounded by
/// `max_concurrent_transfers`. Local sources are mirrored into staging by the
/// copy bridge in a single call. Either way a file is only renamed into the
/// live directory once its staged copy is complete.
pub struct ContentUpdateEngine {
    config: EngineConfig,
    names: Vec<String>,
    digests: HashMap<String, String>,
    fetcher: Arc<dyn Fetcher>,
    copier: Arc<dyn CopyBridge>,
    listener: Arc<dyn TransferListener>,
    guard: UpdateGuard,
}

impl ContentUpdateEngine {
    /// Create an engine for `names`, resolved against `config.remote`.
    pub fn new<I, S>(config: EngineConfig, names: I) -> UpdateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fetcher = Arc::new(HttpFetcher::with_timeout(config.fetch_timeout)?);
        let copier = config.copy_tool.build_bridge();

        Ok(Self {
            config,
            names: names.into_iter().map(Into::into).collect(),
            digests: HashMap::new(),
            fetcher,
            copier,
            listener: Arc::new(LogListener),
            guard: UpdateGuard::default(),
        })
    }

    /// Require the file `name` to match a SHA-256 digest before promotion.
    pub fn with_expected_sha256(
        mut self,
        name: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        self.digests.insert(name.into(), digest.into());
        self
    }

    /// Replace the network fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replace the copy bridge used for local sources.
    pub fn with_copy_bridge(mut self, copier: Arc<dyn CopyBridge>) -> Self {
        self.copier = copier;
        self
    }

    /// Replace the per-file promotion listener.
    pub fn with_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether an update is currently running on this instance.
    pub fn is_updating(&self) -> bool {
        self.guard.is_running()
    }

    async fn run(&self) -> UpdateResult<UpdateReport> {
        let _token = self.guard.acquire()?;

        let root = SourceLocator::parse(&self.config.remote)?;
        let mut set = TransferSet::from_names(
            &root,
            &self.names,
            &self.config.staging_dir,
            &self.config.final_dir,
        )?;
        self.apply_digests(&mut set);

        let report = self.run_set(&root, &mut set).await?;
        info!(
            promoted = report.promoted_count(),
            requested = set.len(),
            "Content update complete"
        );
        Ok(report)
    }

    /// Attach configured digests to the units they name.
    pub(crate) fn apply_digests(&self, set: &mut TransferSet) {
        for index in 0..set.len() {
            if let Some(unit) = set.get_mut(index) {
                if let Some(digest) = self.digests.get(&unit.file_name()) {
                    unit.set_expected_sha256(digest.as_str());
                }
            }
        }
    }

    /// Transfer and promote every unit of `set`.
    ///
    /// `root` decides the mode. In local mode it is the directory the copy
    /// bridge mirrors from. On failure, units that were not promoted are
    /// marked failed and their staged files removed; units already promoted
    /// stay in place.
    pub(crate) async fn run_set(
        &self,
        root: &SourceLocator,
        set: &mut TransferSet,
    ) -> UpdateResult<UpdateReport> {
        let mode = root.mode();
        info!(remote = %root, files = set.len(), ?mode, "Starting update");

        ensure_dir(&self.config.staging_dir).await?;
        ensure_dir(&self.config.final_dir).await?;

        let mut report = UpdateReport::new(mode);
        if set.is_empty() {
            debug!("Nothing to transfer");
            return Ok(report);
        }

        let result = match mode {
            TransferMode::Network => self.run_network(set, &mut report).await,
            TransferMode::Local => self.run_local(root, set, &mut report).await,
        };

        if let Err(e) = result {
            error!(remote = %root, error = %e, "Update failed");
            set.fail_remaining();
            discard_staged(set).await;
            return Err(e);
        }
        Ok(report)
    }

    async fn run_network(
        &self,
        set: &mut TransferSet,
        report: &mut UpdateReport,
    ) -> UpdateResult<()> {
        let mut jobs = Vec::with_capacity(set.len());
        for (index, unit) in set.all().iter().enumerate() {
            jobs.push((index, unit.source().clone(), unit.staging_path().to_path_buf()));
        }
        for index in 0..set.len() {
            if let Some(unit) = set.get_mut(index) {
                unit.advance(TransferStatus::InFlight)?;
            }
        }

        let fetcher = &self.fetcher;
        let mut fetches = stream::iter(jobs)
            .map(move |(index, source, staging)| async move {
                let result = match &source {
                    SourceLocator::Url(url) => fetcher.fetch(url, &staging).await,
                    SourceLocator::Path(path) => Err(UpdateError::transfer(
                        path.display(),
                        "local source in a network transfer",
                    )),
                };
                (index, result)
            })
            .buffer_unordered(self.config.max_concurrent_transfers.max(1));

        let mut tracker = CompletionTracker::new(set.len());
        while let Some((index, result)) = fetches.next().await {
            let Some(unit) = set.get_mut(index) else {
                continue;
            };

            let outcome = match result {
                Ok(bytes) => {
                    debug!(file = %unit.file_name(), bytes, "Fetched");
                    self.stage_and_promote(unit, report).await
                }
                Err(e) => Err(e),
            };

            let progress = match outcome {
                Ok(()) => tracker.resolve_success(),
                Err(e) => {
                    unit.fail();
                    tracker.resolve_failure(e)
                }
            };
            if progress == Progress::Failed {
                break;
            }
        }
        // Dropping the stream cancels fetches still in progress.
        drop(fetches);

        tracker.into_result()
    }

    async fn run_local(
        &self,
        root: &SourceLocator,
        set: &mut TransferSet,
        report: &mut UpdateReport,
    ) -> UpdateResult<()> {
        let source_dir = root
            .as_path()
            .ok_or_else(|| UpdateError::transfer(root, "not a local source"))?;
        let request = CopyRequest::for_files(
            source_dir.to_path_buf(),
            self.config.staging_dir.clone(),
            set.file_names(),
        );

        for index in 0..set.len() {
            if let Some(unit) = set.get_mut(index) {
                unit.advance(TransferStatus::InFlight)?;
            }
        }

        let outcome = self.copier.mirror(&request).await;
        report.copy_outcome = Some(outcome.clone());

        match outcome {
            CopyOutcome::NoChange => {
                info!(source = %source_dir.display(), "Already up to date");
                Ok(())
            }
            CopyOutcome::Copied => {
                let mut tracker = CompletionTracker::new(set.len());
                for index in 0..set.len() {
                    let Some(unit) = set.get_mut(index) else {
                        continue;
                    };
                    let progress = match self.stage_and_promote(unit, report).await {
                        Ok(()) => tracker.resolve_success(),
                        Err(e) => {
                            unit.fail();
                            tracker.resolve_failure(e)
                        }
                    };
                    if progress == Progress::Failed {
                        break;
                    }
                }
                tracker.into_result()
            }
            CopyOutcome::ToolFailure { code, detail } => {
                Err(UpdateError::CopyToolFailure { code, detail })
            }
        }
    }

    async fn stage_and_promote(
        &self,
        unit: &mut TransferUnit,
        report: &mut UpdateReport,
    ) -> UpdateResult<()> {
        verify_staged(unit).await?;
        unit.advance(TransferStatus::Staged)?;

        promote(unit.staging_path(), unit.final_path()).await?;
        unit.advance(TransferStatus::Promoted)?;

        report.promoted.push(unit.final_path().to_path_buf());
        self.listener.loaded(unit);
        Ok(())
    }
}

impl UpdateEngine for ContentUpdateEngine {
    fn update(&self) -> futures::future::BoxFuture<'_, UpdateResult<UpdateReport>> {
        Box::pin(self.run())
    }
}

/// Confirm the staged file exists and matches its digest, if one is set.
async fn verify_staged(unit: &TransferUnit) -> UpdateResult<()> {
    let staging = unit.staging_path().to_path_buf();
    match tokio::fs::metadata(&staging).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(UpdateError::transfer(
                unit.source(),
                "file missing from staging after transfer",
            ))
        }
    }

    if let Some(expected) = unit.expected_sha256() {
        let expected = expected.to_string();
        let path = staging.clone();
        tokio::task::spawn_blocking(move || verify_checksum(&path, &expected))
            .await
            .map_err(|e| UpdateError::transfer(staging.display(), e))??;
    }
    Ok(())
}
