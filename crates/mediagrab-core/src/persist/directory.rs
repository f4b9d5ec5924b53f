//! Sink that saves into a local directory through `.part` files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use super::{Payload, PersistError, PersistRequest, PersistStatus, PersistenceHandle, PersistenceSink};
use crate::fetch::Fetcher;
use crate::storage::PartFile;
use crate::url_model::sanitize_filename;

/// Saves payloads as files in `dir`. Remote payloads are streamed with the
/// sink's own fetcher. Saving happens inside `persist`, so by the time it
/// returns the handle's status is final.
pub struct DirectorySink {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    next_id: AtomicU64,
    statuses: Mutex<HashMap<PersistenceHandle, PersistStatus>>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
            next_id: AtomicU64::new(1),
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record(&self, handle: PersistenceHandle, status: PersistStatus) {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(handle, status);
    }

    fn save(&self, request: &PersistRequest, final_path: &Path) -> Result<u64> {
        let part = PartFile::create(final_path)?;
        let written = match &request.payload {
            Payload::Bytes(bytes) => part
                .reserve(bytes.len() as u64)
                .and_then(|()| part.write_at(0, bytes))
                .map(|()| bytes.len() as u64),
            Payload::Remote { url } => {
                let mut w = part.writer();
                self.fetcher
                    .fetch_into(url, &request.headers, &mut w)
                    .with_context(|| format!("transfer {}", url))
            }
        };
        match written {
            Ok(n) => {
                part.commit()?;
                Ok(n)
            }
            Err(e) => {
                part.abandon();
                Err(e)
            }
        }
    }
}

impl PersistenceSink for DirectorySink {
    fn persist(&self, request: PersistRequest) -> Result<PersistenceHandle, PersistError> {
        let name = sanitize_filename(&request.filename);
        if name.is_empty() {
            return Err(PersistError::InvalidFilename(request.filename));
        }
        std::fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let handle = PersistenceHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.record(handle, PersistStatus::InProgress);

        let final_path = self.dir.join(&name);
        let status = match self.save(&request, &final_path) {
            Ok(bytes) => {
                tracing::info!(%handle, path = %final_path.display(), bytes, "saved");
                PersistStatus::Complete
            }
            Err(e) => {
                tracing::warn!(%handle, path = %final_path.display(), "save failed: {:#}", e);
                PersistStatus::Failed(format!("{:#}", e))
            }
        };
        self.record(handle, status);
        Ok(handle)
    }

    fn poll(&self, handle: PersistenceHandle) -> PersistStatus {
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&handle)
            .cloned()
            .unwrap_or(PersistStatus::Unknown)
    }
}
