//! Temp-file lifecycle for saved files.
//!
//! Files are written to `<name>.part`, synced, then atomically renamed to
//! their final name, so a half-written file never appears under the real name.

mod part;

pub use part::{PartFile, PartWriter};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.zip` → `a.zip.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}
