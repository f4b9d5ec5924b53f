//! Resource fetcher: retrieve one remote resource's bytes.
//!
//! The fetcher performs exactly one transfer per call. Retrying is left to
//! callers (the single-resource pipeline retries with another strategy; the
//! bulk pipeline substitutes a placeholder instead).

mod http;

pub use http::{CurlFetcher, CurlOptions};

use std::collections::HashMap;
use std::io::Write;

/// Per-resource transfer failure. The `Display` text is what ends up in
/// placeholder entries and failure reports.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, timeout or other transport-level failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ::curl::Error,
    },
    /// Response had a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u32 },
    /// The body could not be written to its destination.
    #[error("writing response body failed: {0}")]
    Write(#[source] std::io::Error),
    /// Failure reported by a non-curl transport.
    #[error("{0}")]
    Other(String),
}

/// Retrieves remote resources. Implementations are blocking; async callers
/// run them inside `spawn_blocking`.
pub trait Fetcher: Send + Sync {
    /// Fetches `url` with extra request headers, calling `on_progress(loaded, total)`
    /// zero or more times. `total` is `None` when the origin sends no size.
    fn fetch_with_progress(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, FetchError>;

    /// Fetches `url` without extra headers or progress reporting.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_progress(url, &HashMap::new(), &mut |_, _| {})
    }

    /// Streams `url` into `out`, returning the number of bytes written.
    ///
    /// The default buffers the whole body first; transports that can stream
    /// should override it.
    fn fetch_into(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        out: &mut dyn Write,
    ) -> Result<u64, FetchError> {
        let body = self.fetch_with_progress(url, headers, &mut |_, _| {})?;
        out.write_all(&body).map_err(FetchError::Write)?;
        Ok(body.len() as u64)
    }
}
