//! Bulk pipeline: fetch every URL in order, archive, persist.
//!
//! Per-item fetch failures never stop the job. They are collected in
//! [`JobResult::failures`] and, in [`PlaceholderMode::Collapsed`], leave a
//! diagnostic `error_read_me.txt` in the archive. Only compression and the
//! final sink call can fail the job.

use std::fmt;
use std::sync::Arc;

use super::PlaceholderMode;
use crate::archive::{ArchiveBuilder, CompressionError, CompressionKind};
use crate::config::MediagrabConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::persist::{PersistError, PersistRequest, PersistenceHandle, PersistenceSink};
use crate::placeholder::placeholder;
use crate::progress::{FractionFormula, Phase, ProgressEvent, ProgressSink};
use crate::url_model::{archive_file_name, entry_name};

/// URLs to bundle, in archive order, plus the label used to name the archive.
#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    pub urls: Vec<String>,
    pub account: Option<String>,
}

impl BulkRequest {
    pub fn new(urls: Vec<String>, account: Option<String>) -> Self {
        Self { urls, account }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOptions {
    pub fraction: FractionFormula,
    pub placeholder: PlaceholderMode,
    pub compression: CompressionKind,
}

impl BulkOptions {
    pub fn from_config(cfg: &MediagrabConfig) -> Self {
        Self {
            fraction: cfg.progress_fraction,
            placeholder: cfg.placeholder,
            compression: cfg.compression,
        }
    }
}

/// Where a bulk job is. `Failed` is only entered from `Compressing` or `Persisting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkState {
    Idle,
    Downloading(usize),
    Compressing,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for BulkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkState::Idle => write!(f, "idle"),
            BulkState::Downloading(i) => write!(f, "downloading({})", i),
            BulkState::Compressing => write!(f, "compressing"),
            BulkState::Persisting => write!(f, "persisting"),
            BulkState::Done => write!(f, "done"),
            BulkState::Failed => write!(f, "failed"),
        }
    }
}

/// One resource that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a bulk job that reached the sink.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub archive_name: String,
    pub archive_size: usize,
    /// Archive entry names, in archive order.
    pub entries: Vec<String>,
    /// Fetch failures, in request order.
    pub failures: Vec<FetchFailure>,
    pub handle: PersistenceHandle,
    /// Always [`BulkState::Done`]; failed jobs return [`BulkError`] instead.
    pub state: BulkState,
}

/// Fatal bulk-job error.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    #[error("compressing archive failed: {0}")]
    Compression(#[from] CompressionError),
    #[error("saving archive failed: {0}")]
    Persist(#[from] PersistError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Tracks and logs state transitions for one job.
struct JobState {
    state: BulkState,
}

impl JobState {
    fn enter(&mut self, next: BulkState) {
        tracing::debug!(from = %self.state, to = %next, "bulk job state");
        self.state = next;
    }
}

pub struct BulkPipeline {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn PersistenceSink>,
    options: BulkOptions,
}

impl BulkPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn PersistenceSink>,
        options: BulkOptions,
    ) -> Self {
        Self {
            fetcher,
            sink,
            options,
        }
    }

    /// Runs one bulk job to completion. Progress is reported through
    /// `progress`: one download event per URL, then compression events.
    pub async fn run(
        &self,
        request: BulkRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JobResult, BulkError> {
        let mut job = JobState {
            state: BulkState::Idle,
        };
        let total = request.urls.len();
        tracing::info!(items = total, account = ?request.account, "bulk job started");

        let mut archive = ArchiveBuilder::new(self.options.compression);
        let mut failures = Vec::new();

        for (index, url) in request.urls.iter().enumerate() {
            job.enter(BulkState::Downloading(index));
            match self.fetch_one(url).await {
                Ok(bytes) => {
                    let name = entry_name(url);
                    if archive.insert(name, bytes) {
                        tracing::debug!(url, entry = name, "entry replaced by later resource");
                    }
                }
                Err(e) => {
                    tracing::warn!(url, "fetch failed: {}", e);
                    if self.options.placeholder == PlaceholderMode::Collapsed {
                        let (name, bytes) = placeholder(&e);
                        archive.insert(name, bytes);
                    }
                    failures.push(FetchFailure {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                }
            }

            progress.emit(ProgressEvent {
                phase: Phase::Download,
                fraction: self.options.fraction.download_fraction(index, total),
                is_first: index == 0,
                is_last: index + 1 == total,
            });
        }

        job.enter(BulkState::Compressing);
        let entries: Vec<String> = archive.entry_names().map(str::to_string).collect();
        let blob = match compress(archive, Arc::clone(&progress)).await {
            Ok(blob) => blob,
            Err(e) => {
                job.enter(BulkState::Failed);
                return Err(e);
            }
        };

        job.enter(BulkState::Persisting);
        let archive_name = archive_file_name(request.account.as_deref());
        let archive_size = blob.len();
        let sink = Arc::clone(&self.sink);
        let name = archive_name.clone();
        let persisted = tokio::task::spawn_blocking(move || {
            sink.persist(PersistRequest::bytes(blob, name))
        })
        .await
        .map_err(BulkError::from)
        .and_then(|r| r.map_err(BulkError::from));
        let handle = match persisted {
            Ok(handle) => handle,
            Err(e) => {
                job.enter(BulkState::Failed);
                return Err(e);
            }
        };

        job.enter(BulkState::Done);
        tracing::info!(
            archive = %archive_name,
            bytes = archive_size,
            entries = entries.len(),
            failures = failures.len(),
            %handle,
            "bulk job handed to sink"
        );
        Ok(JobResult {
            archive_name,
            archive_size,
            entries,
            failures,
            handle,
            state: job.state,
        })
    }

    /// Fetches one URL off the async runtime. A panicking fetcher counts as a
    /// failed item, not a failed job.
    async fn fetch_one(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let fetcher = Arc::clone(&self.fetcher);
        let u = url.to_string();
        match tokio::task::spawn_blocking(move || fetcher.fetch(&u)).await {
            Ok(outcome) => outcome,
            Err(e) => Err(FetchError::Other(format!("fetch task failed: {}", e))),
        }
    }
}

/// Finalizes `archive`, translating builder ticks into compression events.
async fn compress(
    archive: ArchiveBuilder,
    progress: Arc<dyn ProgressSink>,
) -> Result<Vec<u8>, BulkError> {
    let blob = tokio::task::spawn_blocking(move || {
        let mut is_first = true;
        archive.finalize(|tick| {
            progress.emit(ProgressEvent {
                phase: Phase::Compression,
                fraction: tick.percent / 100.0,
                is_first,
                is_last: tick.percent >= 100.0,
            });
            is_first = false;
        })
    })
    .await??;
    Ok(blob)
}
