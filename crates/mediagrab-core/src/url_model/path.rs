//! Short-name derivation from a resource URL.

/// Returns the last path segment of `url` with any query string stripped.
///
/// This is a plain text operation: it does not parse or normalize the URL, so
/// two identifiers that differ only in their query map to the same name. A URL
/// ending in `/` yields an empty name; [`entry_name`] never does.
pub fn short_name(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query.rsplit('/').next().unwrap_or(without_query)
}

/// Name used for a fetched resource on disk or in an archive: the short name,
/// or for a URL ending in `/` the last non-empty path segment (`dir` for
/// `https://cdn/dir/`). Never empty.
pub fn entry_name(url: &str) -> &str {
    let name = short_name(url);
    if !name.is_empty() {
        return name;
    }
    url.split('?')
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_ENTRY_NAME)
}

/// Last resort for identifiers made only of slashes.
pub const FALLBACK_ENTRY_NAME: &str = "download";
