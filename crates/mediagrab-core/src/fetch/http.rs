//! libcurl-backed fetcher.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use curl::easy::{Easy, List};

use super::{FetchError, Fetcher};
use crate::config::MediagrabConfig;

/// Transfer tuning shared by every request a `CurlFetcher` makes.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub max_redirections: u32,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            timeout: Duration::from_secs(300),
            user_agent: None,
            max_redirections: 10,
        }
    }
}

impl CurlOptions {
    pub fn from_config(cfg: &MediagrabConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            user_agent: cfg.user_agent.clone(),
            ..Self::default()
        }
    }
}

/// Blocking HTTP(S) fetcher using one libcurl easy handle per request.
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    options: CurlOptions,
}

impl CurlFetcher {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    /// Builds a handle for a GET of `url` with the configured timeouts and headers.
    fn prepare(&self, url: &str, headers: &HashMap<String, String>) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.options.max_redirections)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.timeout)?;
        if let Some(ua) = &self.options.user_agent {
            easy.useragent(ua)?;
        }

        if !headers.is_empty() {
            let mut list = List::new();
            for (k, v) in headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

fn transport(url: &str) -> impl Fn(curl::Error) -> FetchError + '_ {
    move |source| FetchError::Transport {
        url: url.to_string(),
        source,
    }
}

fn check_status(easy: &mut Easy, url: &str) -> Result<(), FetchError> {
    let status = easy.response_code().map_err(transport(url))?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            url: url.to_string(),
            status,
        });
    }
    Ok(())
}

impl Fetcher for CurlFetcher {
    fn fetch_with_progress(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, FetchError> {
        let mut easy = self.prepare(url, headers).map_err(transport(url))?;
        easy.progress(true).map_err(transport(url))?;

        let mut body = Vec::new();
        let mut last_loaded = 0u64;
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(transport(url))?;
            transfer
                .progress_function(|dltotal, dlnow, _, _| {
                    let loaded = dlnow as u64;
                    if loaded != last_loaded {
                        last_loaded = loaded;
                        let total = (dltotal > 0.0).then_some(dltotal as u64);
                        on_progress(loaded, total);
                    }
                    true
                })
                .map_err(transport(url))?;
            transfer.perform().map_err(transport(url))?;
        }

        check_status(&mut easy, url)?;
        tracing::debug!(url, bytes = body.len(), "fetched resource");
        Ok(body)
    }

    fn fetch_into(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        out: &mut dyn Write,
    ) -> Result<u64, FetchError> {
        let mut easy = self.prepare(url, headers).map_err(transport(url))?;

        let written = RefCell::new(0u64);
        let write_error: RefCell<Option<std::io::Error>> = RefCell::new(None);
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match out.write_all(data) {
                    Ok(()) => {
                        *written.borrow_mut() += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        tracing::warn!("streamed write failed: {}", e);
                        write_error.borrow_mut().replace(e);
                        // Short count aborts the transfer.
                        Ok(0)
                    }
                })
                .map_err(transport(url))?;
            if let Err(e) = transfer.perform() {
                if e.is_write_error() {
                    if let Some(io_err) = write_error.borrow_mut().take() {
                        return Err(FetchError::Write(io_err));
                    }
                }
                return Err(transport(url)(e));
            }
        }

        check_status(&mut easy, url)?;
        out.flush().map_err(FetchError::Write)?;
        let written = written.into_inner();
        tracing::debug!(url, bytes = written, "streamed resource");
        Ok(written)
    }
}
