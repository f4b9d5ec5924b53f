//! Archive builder: accumulate named payloads, then compress them into one ZIP.
//!
//! Entries are kept in insertion order. Inserting a name that already exists
//! replaces its bytes but keeps its original position, so the last write wins.
//! `finalize` consumes the builder; an archive is compressed exactly once.

mod writer;

pub use writer::CompressionTick;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// ZIP compression method for archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    Deflated,
    Stored,
}

impl CompressionKind {
    fn method(self) -> zip::CompressionMethod {
        match self {
            CompressionKind::Deflated => zip::CompressionMethod::Deflated,
            CompressionKind::Stored => zip::CompressionMethod::Stored,
        }
    }
}

/// Fatal failure while producing the archive blob.
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("writing entry {entry}: {source}")]
    Entry {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// In-memory, ordered collection of archive entries.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: IndexMap<String, Vec<u8>>,
    compression: CompressionKind,
}

impl ArchiveBuilder {
    pub fn new(compression: CompressionKind) -> Self {
        Self {
            entries: IndexMap::new(),
            compression,
        }
    }

    /// Adds `bytes` under `name`, replacing any earlier entry with that name.
    /// Returns true if an entry was replaced.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> bool {
        self.entries.insert(name.into(), bytes).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Compresses every entry into a ZIP blob, reporting progress through
    /// `on_progress`. See [`CompressionTick`] for the tick sequence.
    pub fn finalize(
        self,
        on_progress: impl FnMut(CompressionTick),
    ) -> Result<Vec<u8>, CompressionError> {
        writer::write_zip(self.entries, self.compression, on_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn read_back(blob: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut zip = zip::ZipArchive::new(Cursor::new(blob)).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut f = zip.by_index(i).unwrap();
                let mut buf = Vec::new();
                f.read_to_end(&mut buf).unwrap();
                (f.name().to_string(), buf)
            })
            .collect()
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut b = ArchiveBuilder::default();
        assert!(!b.insert("a.jpg", b"1".to_vec()));
        assert!(!b.insert("b.jpg", b"2".to_vec()));
        assert!(b.insert("a.jpg", b"3".to_vec()));
        assert_eq!(b.len(), 2);
        assert_eq!(b.entry_names().collect::<Vec<_>>(), ["a.jpg", "b.jpg"]);
        assert_eq!(b.get("a.jpg"), Some(&b"3"[..]));
    }

    #[test]
    fn finalize_round_trips_entries_in_order() {
        let mut b = ArchiveBuilder::new(CompressionKind::Deflated);
        b.insert("a1.jpg", vec![0xff; 4096]);
        b.insert("a2.mp4", b"movie".to_vec());
        let blob = b.finalize(|_| {}).unwrap();
        let entries = read_back(blob);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "a1.jpg");
        assert_eq!(entries[0].1, vec![0xff; 4096]);
        assert_eq!(entries[1], ("a2.mp4".to_string(), b"movie".to_vec()));
    }

    #[test]
    fn stored_archive_is_readable() {
        let mut b = ArchiveBuilder::new(CompressionKind::Stored);
        b.insert("x.txt", b"plain".to_vec());
        let entries = read_back(b.finalize(|_| {}).unwrap());
        assert_eq!(entries, vec![("x.txt".to_string(), b"plain".to_vec())]);
    }

    #[test]
    fn empty_archive_is_valid_zip() {
        let b = ArchiveBuilder::default();
        assert!(b.is_empty());
        let blob = b.finalize(|_| {}).unwrap();
        assert!(read_back(blob).is_empty());
    }
}
