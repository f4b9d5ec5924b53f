//! Persistence sink: the mechanism that durably saves a finished payload.
//!
//! Pipelines only call `persist` and, in the single-resource flow, `poll`.
//! A sink may accept a request (returning a handle) and still fail to save
//! it; that failure is only visible through `poll`.

mod directory;

pub use directory::DirectorySink;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// What the sink is asked to save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Bytes already in memory (archives, fetched resources).
    Bytes(Vec<u8>),
    /// A remote resource the sink transfers itself.
    Remote { url: String },
}

/// One save request.
#[derive(Debug, Clone)]
pub struct PersistRequest {
    pub payload: Payload,
    pub filename: String,
    /// Request headers for `Payload::Remote` transfers.
    pub headers: HashMap<String, String>,
}

impl PersistRequest {
    pub fn bytes(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            payload: Payload::Bytes(bytes),
            filename: filename.into(),
            headers: HashMap::new(),
        }
    }

    pub fn remote(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            payload: Payload::Remote { url: url.into() },
            filename: filename.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Opaque id of an accepted save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersistenceHandle(u64);

impl PersistenceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PersistenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of an accepted request as reported by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    InProgress,
    Complete,
    Failed(String),
    /// The sink has no record of the handle.
    Unknown,
}

impl PersistStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, PersistStatus::Failed(_))
    }
}

/// The sink refused a request outright.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid file name {0:?}")]
    InvalidFilename(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save rejected: {0}")]
    Rejected(String),
}

/// Saves payloads under a file name.
pub trait PersistenceSink: Send + Sync {
    /// Accepts a save request. Returning `Ok` does not mean the payload has
    /// been written; use [`poll`](Self::poll) for that.
    fn persist(&self, request: PersistRequest) -> Result<PersistenceHandle, PersistError>;

    fn poll(&self, handle: PersistenceHandle) -> PersistStatus;
}
