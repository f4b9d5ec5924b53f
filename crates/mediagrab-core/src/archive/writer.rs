//! ZIP serialization with per-entry progress ticks.

use std::io::{Cursor, Write};

use indexmap::IndexMap;
use zip::write::FileOptions;
use zip::ZipWriter;

use super::{CompressionError, CompressionKind};

/// Progress report emitted while an archive is being compressed.
///
/// A run always starts with one tick at 0 and ends with exactly one tick at
/// 100. With N entries there is one tick after each entry, at `(i+1)/N * 100`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionTick {
    /// Percent complete, 0.0 to 100.0.
    pub percent: f64,
    /// Entry being written (None for an empty archive).
    pub current_file: Option<String>,
}

pub(super) fn write_zip(
    entries: IndexMap<String, Vec<u8>>,
    compression: CompressionKind,
    mut on_progress: impl FnMut(CompressionTick),
) -> Result<Vec<u8>, CompressionError> {
    let total = entries.len();
    let capacity: usize = entries.values().map(Vec::len).sum();
    let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(capacity)));
    let options = FileOptions::default().compression_method(compression.method());

    on_progress(CompressionTick {
        percent: 0.0,
        current_file: entries.keys().next().cloned(),
    });

    for (i, (name, bytes)) in entries.into_iter().enumerate() {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)
            .map_err(|source| CompressionError::Entry {
                entry: name.clone(),
                source,
            })?;
        on_progress(CompressionTick {
            percent: (i + 1) as f64 / total as f64 * 100.0,
            current_file: Some(name),
        });
    }

    let blob = zip.finish()?.into_inner();
    if total == 0 {
        on_progress(CompressionTick {
            percent: 100.0,
            current_file: None,
        });
    }
    tracing::debug!(entries = total, bytes = blob.len(), "archive finalized");
    Ok(blob)
}
