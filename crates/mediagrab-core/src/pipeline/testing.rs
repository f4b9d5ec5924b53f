//! In-memory fetcher and sink doubles for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::fetch::{FetchError, Fetcher};
use crate::persist::{PersistError, PersistRequest, PersistStatus, PersistenceHandle, PersistenceSink};

/// Serves canned bodies or errors keyed by URL. Unknown URLs fail with HTTP 404.
#[derive(Default)]
pub(crate) struct MapFetcher {
    responses: HashMap<String, Result<Vec<u8>, String>>,
    calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ok(mut self, url: &str, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_vec()));
        self
    }

    pub(crate) fn err(mut self, url: &str, error: &str) -> Self {
        self.responses.insert(url.to_string(), Err(error.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MapFetcher {
    fn fetch_with_progress(
        &self,
        url: &str,
        _headers: &HashMap<String, String>,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => {
                on_progress(body.len() as u64, Some(body.len() as u64));
                Ok(body.clone())
            }
            Some(Err(e)) => Err(FetchError::Other(e.clone())),
            None => Err(FetchError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Records requests. The first `fail_first` accepted requests report
/// `Failed` when polled; with `reject` set every request is refused.
#[derive(Default)]
pub(crate) struct MemorySink {
    requests: Mutex<Vec<PersistRequest>>,
    fail_first: usize,
    reject: bool,
    polls: AtomicUsize,
}

impl MemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::default()
        }
    }

    pub(crate) fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<PersistRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&self, request: PersistRequest) -> Result<PersistenceHandle, PersistError> {
        if self.reject {
            return Err(PersistError::Rejected("sink closed".to_string()));
        }
        let mut reqs = self.requests.lock().unwrap();
        reqs.push(request);
        Ok(PersistenceHandle::new(reqs.len() as u64))
    }

    fn poll(&self, handle: PersistenceHandle) -> PersistStatus {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if handle.id() as usize <= self.fail_first {
            PersistStatus::Failed("interrupted".to_string())
        } else if handle.id() as usize <= self.requests.lock().unwrap().len() {
            PersistStatus::Complete
        } else {
            PersistStatus::Unknown
        }
    }
}
