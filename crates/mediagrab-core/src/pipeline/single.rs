//! Single-resource pipeline: one save request, one status check, and at most
//! one delayed retry through the other strategy.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::persist::{PersistStatus, PersistenceHandle, PersistenceSink};
use crate::strategy::{strategy_for, RetrievalStrategy, StrategyError, StrategyKind};
use crate::url_model::single_file_name;

/// Pause between a failed first attempt and the retry.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SingleRequest {
    pub url: String,
    pub account: String,
}

impl SingleRequest {
    pub fn new(url: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            account: account.into(),
        }
    }
}

/// What the retry task ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The alternate strategy ran; `None` if it was refused or errored.
    Attempted(Option<PersistenceHandle>),
    /// Cancelled before the delay elapsed.
    Cancelled,
}

/// Handle to the scheduled retry. Dropping it does not cancel the retry.
pub struct RetryTask {
    cancel: CancellationToken,
    handle: JoinHandle<RetryOutcome>,
}

impl RetryTask {
    /// Stops the retry if it has not started yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> RetryOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("retry task failed: {}", e);
                RetryOutcome::Attempted(None)
            }
        }
    }
}

/// Result of [`SinglePipeline::download_single`]. The call returns once the
/// first attempt has been checked; a retry, if any, keeps running.
pub struct SingleOutcome {
    pub file_name: String,
    /// Handle of the first attempt, if the sink accepted it.
    pub handle: Option<PersistenceHandle>,
    pub retry: Option<RetryTask>,
}

impl SingleOutcome {
    pub fn retried(&self) -> bool {
        self.retry.is_some()
    }
}

pub struct SinglePipeline {
    sink: Arc<dyn PersistenceSink>,
    primary: Arc<dyn RetrievalStrategy>,
    fallback: Arc<dyn RetrievalStrategy>,
}

impl SinglePipeline {
    pub fn new(
        sink: Arc<dyn PersistenceSink>,
        primary: Arc<dyn RetrievalStrategy>,
        fallback: Arc<dyn RetrievalStrategy>,
    ) -> Self {
        Self {
            sink,
            primary,
            fallback,
        }
    }

    /// Uses `kind` first and its alternate for the retry.
    pub fn for_kind(
        kind: StrategyKind,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn PersistenceSink>,
        referer: Option<String>,
    ) -> Self {
        let primary = strategy_for(kind, fetcher.clone(), sink.clone(), referer.clone());
        let fallback = strategy_for(kind.alternate(), fetcher, sink.clone(), referer);
        Self::new(sink, primary, fallback)
    }

    /// Saves `request.url` as `{account}_{short name}`.
    ///
    /// The sink is polled once right after the request is accepted. If that
    /// poll reports a failure, or the first strategy could not get a request
    /// accepted at all, one retry through the fallback strategy is scheduled
    /// after [`RETRY_DELAY`]. The retry's own result is only logged.
    pub async fn download_single(&self, request: SingleRequest) -> SingleOutcome {
        let file_name = single_file_name(&request.account, &request.url);
        tracing::info!(
            url = %request.url,
            file = %file_name,
            strategy = %self.primary.kind(),
            "single download"
        );

        let primary = Arc::clone(&self.primary);
        let sink = Arc::clone(&self.sink);
        let url = request.url.clone();
        let name = file_name.clone();
        let first = tokio::task::spawn_blocking(move || {
            let handle = primary.retrieve(&url, &name)?;
            let status = sink.poll(handle);
            Ok::<_, StrategyError>((handle, status))
        })
        .await;

        let (handle, needs_retry) = match first {
            Ok(Ok((handle, status))) => {
                tracing::debug!(%handle, ?status, "first attempt polled");
                (Some(handle), matches!(status, PersistStatus::Failed(_)))
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %request.url, "first attempt refused: {}", e);
                (None, true)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, "first attempt task failed: {}", e);
                (None, true)
            }
        };

        let retry = needs_retry.then(|| self.schedule_retry(request.url, file_name.clone()));
        SingleOutcome {
            file_name,
            handle,
            retry,
        }
    }

    fn schedule_retry(&self, url: String, file_name: String) -> RetryTask {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let fallback = Arc::clone(&self.fallback);
        tracing::info!(%url, strategy = %fallback.kind(), "retry scheduled");

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(%url, "retry cancelled");
                    return RetryOutcome::Cancelled;
                }
                _ = tokio::time::sleep(RETRY_DELAY) => {}
            }

            let u = url.clone();
            let attempt =
                tokio::task::spawn_blocking(move || fallback.retrieve(&u, &file_name)).await;
            match attempt {
                Ok(Ok(handle)) => {
                    tracing::info!(%url, %handle, "retry accepted");
                    RetryOutcome::Attempted(Some(handle))
                }
                Ok(Err(e)) => {
                    tracing::warn!(%url, "retry refused: {}", e);
                    RetryOutcome::Attempted(None)
                }
                Err(e) => {
                    tracing::warn!(%url, "retry task failed: {}", e);
                    RetryOutcome::Attempted(None)
                }
            }
        });

        RetryTask { cancel, handle }
    }
}
