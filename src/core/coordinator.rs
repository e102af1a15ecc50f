//! Scan coordinator.
//!
//! Drives discovery and the per-file enrichment pipeline. All record state
//! lives in the [`MediaRecordStore`]; every transition is committed there and
//! published as a fresh snapshot.

use crate::core::scanner::{collect_video_files, guess_title_from_path, ArtifactPaths};
use crate::core::store::{apply_presence, MediaRecordStore};
use crate::models::config::ConfigStore;
use crate::models::media::{ArtifactPresence, MediaRecord, MediaStatus, ProcessingStage};
use crate::services::metadata::{read_sidecar, write_sidecar, MetadataClient};
use crate::services::notifier::NotificationSink;
use crate::utils::fs::{modified_time, write_file};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a single pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Source file is gone.
    Missing,
    /// Already completed and unchanged; nothing done.
    UpToDate,
    /// Another pipeline owns the path.
    InFlight,
    Completed,
    Failed,
    Cancelled,
}

/// Terminal state of a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOutcome {
    #[default]
    Finished,
    Cancelled,
    Failed,
    /// Another scan was running; this call did nothing.
    AlreadyRunning,
}

/// Counters for one full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub outcome: ScanOutcome,
    pub discovered: usize,
    pub completed: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ScanSummary {
    fn already_running() -> Self {
        Self {
            outcome: ScanOutcome::AlreadyRunning,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Completed => self.completed += 1,
            PipelineOutcome::UpToDate => self.up_to_date += 1,
            PipelineOutcome::Failed => self.failed += 1,
            PipelineOutcome::Missing | PipelineOutcome::InFlight => self.skipped += 1,
            PipelineOutcome::Cancelled => self.outcome = ScanOutcome::Cancelled,
        }
    }
}

/// Process-wide scan state: the running flag and the active scan's token.
#[derive(Debug, Default)]
struct ScanState {
    running: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

/// Held by the one running scan. Dropping it clears the flag, whatever way
/// the scan ended.
struct ScanGuard {
    state: Arc<ScanState>,
    sink: Arc<NotificationSink>,
    token: CancellationToken,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.state.cancel.lock().take();
        self.state.running.store(false, Ordering::SeqCst);
        self.sink.publish_scan_status(false);
    }
}

/// Orchestrates scans and single-file reprocessing.
pub struct ScanCoordinator {
    store: Arc<MediaRecordStore>,
    sink: Arc<NotificationSink>,
    metadata: Arc<dyn MetadataClient>,
    config: Arc<ConfigStore>,
    shutdown: CancellationToken,
    scan: Arc<ScanState>,
}

impl std::fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("records", &self.store.len())
            .field("is_scanning", &self.is_scanning())
            .finish()
    }
}

impl ScanCoordinator {
    pub fn new(
        store: Arc<MediaRecordStore>,
        sink: Arc<NotificationSink>,
        metadata: Arc<dyn MetadataClient>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            store,
            sink,
            metadata,
            config,
            shutdown: CancellationToken::new(),
            scan: Arc::new(ScanState::default()),
        }
    }

    pub fn store(&self) -> &Arc<MediaRecordStore> {
        &self.store
    }

    pub fn sink(&self) -> &Arc<NotificationSink> {
        &self.sink
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Whether a full scan is running.
    pub fn is_scanning(&self) -> bool {
        self.scan.running.load(Ordering::SeqCst)
    }

    /// Cancel everything: the running scan and any single-file pipelines.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Signal the running scan to stop. Returns `false` if none is running.
    pub fn cancel_scan(&self) -> bool {
        match self.scan.cancel.lock().as_ref() {
            Some(token) => {
                tracing::info!("Cancelling media library scan");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Claim the process-wide scan flag.
    fn try_claim_scan(&self) -> Option<ScanGuard> {
        if self
            .scan
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Scan already in progress, ignoring request");
            return None;
        }

        let token = self.shutdown.child_token();
        *self.scan.cancel.lock() = Some(token.clone());
        self.sink.publish_scan_status(true);

        Some(ScanGuard {
            state: Arc::clone(&self.scan),
            sink: Arc::clone(&self.sink),
            token,
        })
    }

    /// Run a full scan to completion. A no-op if one is already running.
    pub async fn start_scan(&self) -> ScanSummary {
        match self.try_claim_scan() {
            Some(guard) => self.run_scan(guard).await,
            None => ScanSummary::already_running(),
        }
    }

    /// Start a full scan in the background. Returns `false` if one is
    /// already running.
    pub fn spawn_scan(self: &Arc<Self>) -> bool {
        let Some(guard) = self.try_claim_scan() else {
            return false;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let summary = this.run_scan(guard).await;
            tracing::debug!(?summary, "Background scan finished");
        });
        true
    }

    async fn run_scan(&self, guard: ScanGuard) -> ScanSummary {
        let cancel = guard.token.clone();
        let roots = self.config.get().library_paths;
        tracing::info!("Starting media library scan of {} path(s)", roots.len());

        let mut summary = ScanSummary::default();
        let files = match self.discover(&roots, &cancel).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Media library scan failed during discovery: {}", e);
                self.sink.publish_error(format!("Scan failed: {}", e));
                summary.outcome = ScanOutcome::Failed;
                return summary;
            }
        };
        summary.discovered = files.len();

        for path in &files {
            if cancel.is_cancelled() {
                summary.outcome = ScanOutcome::Cancelled;
                break;
            }
            let outcome = self.process_file(path, &cancel).await;
            summary.record(outcome);
            if outcome == PipelineOutcome::Cancelled {
                break;
            }
        }

        if cancel.is_cancelled() {
            summary.outcome = ScanOutcome::Cancelled;
            tracing::info!("Media library scan cancelled");
        } else {
            tracing::info!(
                "Media library scan finished: {} discovered, {} completed, {} up to date, {} failed",
                summary.discovered,
                summary.completed,
                summary.up_to_date,
                summary.failed
            );
        }

        drop(guard);
        summary
    }

    /// Enumerate library roots and seed unseen files.
    ///
    /// Returns every video found, deduplicated, in discovery order. Missing
    /// or unreadable roots are published as errors and skipped; unreadable
    /// files are logged and skipped.
    async fn discover(&self, roots: &[PathBuf], cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for root in roots {
            if cancel.is_cancelled() {
                break;
            }
            if !root.is_dir() {
                tracing::warn!("Library path does not exist, skipping: {}", root.display());
                self.sink
                    .publish_error(format!("Library path not found: {}", root.display()));
                continue;
            }

            let walk_root = root.clone();
            let found = match tokio::task::spawn_blocking(move || collect_video_files(&walk_root))
                .await
                .map_err(|e| Error::other(format!("enumeration of {} failed: {}", root.display(), e)))?
            {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Skipping library path: {}", e);
                    self.sink.publish_error(e.to_string());
                    continue;
                }
            };

            for path in found {
                if !seen.insert(path.clone()) {
                    continue;
                }
                match self.store.seed(&path) {
                    Ok(Some(record)) => {
                        tracing::debug!(path = %path.display(), status = %record.status, "Discovered new file");
                        self.sink.publish_file_status(&record);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Failed to read {}, skipping: {}", path.display(), e);
                        continue;
                    }
                }
                files.push(path);
            }
        }

        Ok(files)
    }

    /// Discovery-only pass used at startup: seeds new files and re-checks
    /// artifacts of known ones. No network. Returns the number of records.
    pub async fn initialize(&self) -> usize {
        let roots = self.config.get().library_paths;
        match self.discover(&roots, &self.shutdown).await {
            Ok(files) => {
                for path in &files {
                    let before = self.store.get(path);
                    if let Some(after) = self.store.refresh_resource_flags(path) {
                        if before.as_ref() != Some(&after) {
                            self.sink.publish_file_status(&after);
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!("Media library initialization failed: {}", e);
                self.sink.publish_error(format!("Initialization failed: {}", e));
            }
        }

        let count = self.store.len();
        tracing::info!("Media library initialized with {} file(s)", count);
        count
    }

    /// Run the pipeline for one file, independently of any full scan.
    pub async fn process_single_file(&self, path: &Path) -> PipelineOutcome {
        tracing::info!("Processing single file: {}", path.display());
        let cancel = self.shutdown.child_token();
        self.process_file(path, &cancel).await
    }

    /// Background variant of [`Self::process_single_file`].
    pub fn spawn_single_file(self: &Arc<Self>, path: PathBuf) -> JoinHandle<PipelineOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process_single_file(&path).await })
    }

    /// The per-file pipeline. Never fails: errors end up on the record.
    async fn process_file(&self, path: &Path, cancel: &CancellationToken) -> PipelineOutcome {
        if !path.is_file() {
            tracing::debug!("File no longer exists, skipping: {}", path.display());
            return PipelineOutcome::Missing;
        }

        let Some(_guard) = self.store.try_begin(path) else {
            tracing::debug!("Pipeline already running, skipping: {}", path.display());
            return PipelineOutcome::InFlight;
        };

        let mut record = match self.store.get(path) {
            Some(record) => record,
            None => match self.store.seed(path) {
                Ok(Some(record)) => {
                    self.sink.publish_file_status(&record);
                    record
                }
                Ok(None) => match self.store.get(path) {
                    Some(record) => record,
                    None => return PipelineOutcome::Missing,
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                    return PipelineOutcome::Missing;
                }
            },
        };

        let artifacts = ArtifactPaths::for_video(path);
        let presence = artifacts.presence();
        let original = record.clone();
        apply_presence(&mut record, &artifacts, presence);

        if record.is_up_to_date(modified_time(path)) {
            if record != original {
                self.store.upsert(record);
            }
            tracing::debug!("Up to date, skipping: {}", path.display());
            return PipelineOutcome::UpToDate;
        }

        match self
            .run_pipeline(&mut record, &artifacts, presence, cancel)
            .await
        {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Media file processed");
                PipelineOutcome::Completed
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(path = %path.display(), status = %record.status, "Processing cancelled");
                PipelineOutcome::Cancelled
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Processing failed: {}", e);
                record.fail(e.to_string());
                self.commit(&record);
                PipelineOutcome::Failed
            }
        }
    }

    async fn run_pipeline(
        &self,
        record: &mut MediaRecord,
        artifacts: &ArtifactPaths,
        presence: ArtifactPresence,
        cancel: &CancellationToken,
    ) -> Result<()> {
        record.begin(MediaStatus::Scanning, ProcessingStage::Scanning);
        self.commit(record);
        let title = guess_title_from_path(&record.path);

        let existing = if presence.sidecar {
            read_sidecar(&artifacts.sidecar).await
        } else {
            None
        };

        if presence.is_complete() {
            if let Some(movie) = &existing {
                tracing::debug!("Adopting existing NFO: {}", artifacts.sidecar.display());
                record.complete(Some(movie.title.clone()), movie.year);
                self.commit(record);
                return Ok(());
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        record.begin(MediaStatus::Downloading, ProcessingStage::WritingSidecar);
        self.commit(record);

        if title.is_empty() {
            return Err(Error::MovieNotFound(record.file_name.clone()));
        }
        let mut movie = self.metadata.fetch_metadata(&title, cancel).await?;
        tracing::debug!("Resolved '{}' as {} ({:?})", title, movie.title, movie.year);

        if !presence.poster {
            if let Some(url) = movie.art.poster.clone() {
                record.processing_stage = ProcessingStage::FetchingPoster;
                self.commit(record);
                let bytes = self.metadata.download_asset(&url, cancel).await?;
                write_file(&artifacts.poster, &bytes).await?;
                record.poster_path = Some(artifacts.poster.clone());
                self.commit(record);
            }
        }

        if !presence.fanart {
            if let Some(url) = movie.art.fanart.clone() {
                record.processing_stage = ProcessingStage::FetchingFanart;
                self.commit(record);
                let bytes = self.metadata.download_asset(&url, cancel).await?;
                write_file(&artifacts.fanart, &bytes).await?;
                record.fanart_path = Some(artifacts.fanart.clone());
                self.commit(record);
            }
        }

        if existing.is_none() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            record.processing_stage = ProcessingStage::WritingSidecar;
            movie.art.local_poster = artifacts.poster.is_file().then(|| artifacts.poster.clone());
            movie.art.local_fanart = artifacts.fanart.is_file().then(|| artifacts.fanart.clone());
            write_sidecar(&movie, &artifacts.sidecar).await?;
            record.sidecar_path = Some(artifacts.sidecar.clone());
            self.commit(record);
        }

        let verified = artifacts.presence();
        apply_presence(record, artifacts, verified);
        if !verified.is_complete() {
            return Err(Error::MetadataIncomplete {
                path: record.path.display().to_string(),
                missing: verified.missing(),
            });
        }

        record.complete(Some(movie.title), movie.year);
        self.commit(record);
        Ok(())
    }

    /// Store the record and publish the snapshot.
    fn commit(&self, record: &MediaRecord) {
        self.store.upsert(record.clone());
        self.sink.publish_file_status(record);
    }
}
