//! Diagnostic text substituted into an archive for a resource that failed to download.

use std::fmt::Display;

/// Archive entry name every placeholder is stored under.
pub const PLACEHOLDER_ENTRY: &str = "error_read_me.txt";

const EXPLANATION: &str = "\
A request did not succeed, so this file was saved in place of the missing media.

Likely causes:
- Too many items were requested in a short time and the platform is rate
  limiting you. Wait a while and try again.
- Browser or network privacy settings (content blocking, tracking protection)
  blocked the request. Switching them to the standard level usually helps.
- A transient platform or browser bug that blocks these requests. It tends to
  go away on its own.

Error detail:
";

/// Builds the placeholder entry for `error`: the fixed explanation followed by
/// the error's text.
pub fn placeholder(error: &dyn Display) -> (&'static str, Vec<u8>) {
    let mut body = String::from(EXPLANATION);
    body.push_str(&error.to_string());
    body.push('\n');
    (PLACEHOLDER_ENTRY, body.into_bytes())
}
