//! Resource identifiers and the file names derived from them.
//!
//! Short names are derived purely from the URL text so the same identifier
//! always maps to the same archive entry, whatever the network does.

mod path;
mod sanitize;

pub use path::{entry_name, short_name, FALLBACK_ENTRY_NAME};
pub use sanitize::sanitize_filename;

/// Archive file name used when no account label is supplied.
pub const DEFAULT_ARCHIVE_NAME: &str = "bulk_download.zip";

/// Invalid resource identifier (rejected before any pipeline work starts).
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("invalid URL {url:?}: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {scheme:?} in {url:?} (expected http or https)")]
    Scheme { url: String, scheme: String },
}

/// Checks that `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<(), UrlError> {
    let parsed = url::Url::parse(url).map_err(|source| UrlError::Parse {
        url: url.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(UrlError::Scheme {
            url: url.to_string(),
            scheme: other.to_string(),
        }),
    }
}

/// Returns the account label if it carries any text.
fn non_empty(account: Option<&str>) -> Option<&str> {
    account.filter(|a| !a.is_empty())
}

/// File name for a bulk archive: `"{account}.zip"`, or `bulk_download.zip`
/// when the label is absent or empty.
pub fn archive_file_name(account: Option<&str>) -> String {
    match non_empty(account) {
        Some(a) => format!("{a}.zip"),
        None => DEFAULT_ARCHIVE_NAME.to_string(),
    }
}

/// File name for a single-resource download: `"{account}_{entry_name}"`.
pub fn single_file_name(account: &str, url: &str) -> String {
    format!("{}_{}", account, entry_name(url))
}
