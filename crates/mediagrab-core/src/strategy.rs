//! Retrieval strategies for single-resource downloads.
//!
//! Both strategies end with a file saved through the persistence sink; they
//! differ in who performs the transfer. `Direct` hands the URL to the sink
//! (optionally with a `Referer`), `Fetch` downloads the bytes first and then
//! hands the sink a finished buffer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::fetch::{FetchError, Fetcher};
use crate::persist::{PersistError, PersistRequest, PersistenceHandle, PersistenceSink};

/// Which strategy a pipeline uses first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Direct,
    Fetch,
}

impl StrategyKind {
    /// The strategy used for the retry after this one fails.
    pub fn alternate(self) -> Self {
        match self {
            StrategyKind::Direct => StrategyKind::Fetch,
            StrategyKind::Fetch => StrategyKind::Direct,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Direct => write!(f, "direct"),
            StrategyKind::Fetch => write!(f, "fetch"),
        }
    }
}

/// A strategy could not get its request accepted by the sink.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Obtains one resource and saves it under `file_name`.
pub trait RetrievalStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Blocking; returns the handle of the accepted save request.
    fn retrieve(&self, url: &str, file_name: &str) -> Result<PersistenceHandle, StrategyError>;
}

/// Lets the sink stream the resource itself.
pub struct DirectStrategy {
    sink: Arc<dyn PersistenceSink>,
    referer: Option<String>,
}

impl DirectStrategy {
    pub fn new(sink: Arc<dyn PersistenceSink>, referer: Option<String>) -> Self {
        Self { sink, referer }
    }
}

impl RetrievalStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn retrieve(&self, url: &str, file_name: &str) -> Result<PersistenceHandle, StrategyError> {
        let mut request = PersistRequest::remote(url, file_name);
        if let Some(referer) = &self.referer {
            request = request.with_header("Referer", referer.as_str());
        }
        Ok(self.sink.persist(request)?)
    }
}

/// Downloads the bytes, then saves the buffer.
pub struct FetchStrategy {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn PersistenceSink>,
}

impl FetchStrategy {
    pub fn new(fetcher: Arc<dyn Fetcher>, sink: Arc<dyn PersistenceSink>) -> Self {
        Self { fetcher, sink }
    }
}

impl RetrievalStrategy for FetchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fetch
    }

    fn retrieve(&self, url: &str, file_name: &str) -> Result<PersistenceHandle, StrategyError> {
        let bytes = self.fetcher.fetch_with_progress(
            url,
            &Default::default(),
            &mut |loaded, total| {
                tracing::trace!(url, loaded, total = ?total, "fetch progress");
            },
        )?;
        Ok(self.sink.persist(PersistRequest::bytes(bytes, file_name))?)
    }
}

/// Builds the strategy of the given kind over shared collaborators.
pub fn strategy_for(
    kind: StrategyKind,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn PersistenceSink>,
    referer: Option<String>,
) -> Arc<dyn RetrievalStrategy> {
    match kind {
        StrategyKind::Direct => Arc::new(DirectStrategy::new(sink, referer)),
        StrategyKind::Fetch => Arc::new(FetchStrategy::new(fetcher, sink)),
    }
}
