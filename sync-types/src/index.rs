//! Persisted remote index.
//!
//! The index is a single remote object holding a brotli-compressed UTF-8 JSON
//! document that maps every remote name to its last-known content hash, size,
//! permission bits and modification time:
//!
//! ```text
//! { "css/site.css": { "h": "<base64 sha256>", "s": 1024, "m": 420, "t": 1700000000000 } }
//! ```
//!
//! Decoding is lenient: entries with a missing or mistyped field are skipped,
//! and a document whose top level is not an object decodes as empty.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::error::IndexError;

/// Remote name of the index object when none is configured.
pub const DEFAULT_INDEX_NAME: &str = ".htdistsync";

/// Permission bits the index object is uploaded with.
pub const INDEX_MODE: u32 = 0o600;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_LG_WINDOW: u32 = 22;

/// Last-known state of one remote asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Base64 SHA-256 of the local source content.
    #[serde(rename = "h")]
    pub hash: String,
    /// Size of the local source in bytes.
    #[serde(rename = "s")]
    pub size: u64,
    /// Permission bits (lower 9 bits).
    #[serde(rename = "m")]
    pub mode: u32,
    /// Modification time in epoch milliseconds.
    #[serde(rename = "t")]
    pub mtime: i64,
}

/// Mapping from remote name to [`IndexEntry`], ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl RemoteIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `name`.
    pub fn insert(&mut self, name: impl Into<String>, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(name.into(), entry)
    }

    /// Look up the entry for `name`.
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.get(name)
    }

    /// Check whether `name` has an entry.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.entries.iter()
    }

    /// Encode into the compressed document format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IndexError> {
        let json = serde_json::to_vec(&self.entries)?;
        let mut writer = brotli::CompressorWriter::new(
            Vec::new(),
            BROTLI_BUFFER_SIZE,
            BROTLI_QUALITY,
            BROTLI_LG_WINDOW,
        );
        writer.write_all(&json).map_err(IndexError::Compress)?;
        writer.flush().map_err(IndexError::Compress)?;
        Ok(writer.into_inner())
    }

    /// Decode from the compressed document format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        let mut json = Vec::new();
        brotli::Decompressor::new(bytes, BROTLI_BUFFER_SIZE)
            .read_to_end(&mut json)
            .map_err(IndexError::Decompress)?;

        let value: serde_json::Value = serde_json::from_slice(&json)?;
        let mut index = Self::new();
        if let serde_json::Value::Object(map) = value {
            for (name, entry) in map {
                if let Ok(entry) = serde_json::from_value::<IndexEntry>(entry) {
                    index.insert(name, entry);
                }
            }
        }
        Ok(index)
    }
}

impl FromIterator<(String, IndexEntry)> for RemoteIndex {
    fn from_iter<I: IntoIterator<Item = (String, IndexEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RemoteIndex {
    type Item = (String, IndexEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hash: &str, mode: u32) -> IndexEntry {
        IndexEntry {
            hash: hash.to_string(),
            size: 12,
            mode,
            mtime: 1_700_000_000_123,
        }
    }

    fn compress(json: &str) -> Vec<u8> {
        let mut writer = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
        writer.write_all(json.as_bytes()).unwrap();
        writer.into_inner()
    }

    #[test]
    fn export_then_load_preserves_entries() {
        let index: RemoteIndex = [
            ("index.html".to_string(), entry("aGFzaDE=", 0o644)),
            ("css/site.css".to_string(), entry("aGFzaDI=", 0o600)),
        ]
        .into_iter()
        .collect();

        let bytes = index.to_bytes().unwrap();
        let loaded = RemoteIndex::from_bytes(&bytes).unwrap();

        assert_eq!(loaded, index);
    }

    #[test]
    fn document_uses_short_keys() {
        let mut index = RemoteIndex::new();
        index.insert("a", entry("h", 0o644));

        let bytes = index.to_bytes().unwrap();
        let mut json = Vec::new();
        brotli::Decompressor::new(bytes.as_slice(), 4096)
            .read_to_end(&mut json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(value["a"]["h"], "h");
        assert_eq!(value["a"]["s"], 12);
        assert_eq!(value["a"]["m"], 0o644);
        assert_eq!(value["a"]["t"], 1_700_000_000_123i64);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let json = r#"{
            "good": {"h": "abc", "s": 1, "m": 420, "t": 5},
            "string-size": {"h": "abc", "s": "1", "m": 420, "t": 5},
            "missing-hash": {"s": 1, "m": 420, "t": 5},
            "not-an-object": 7
        }"#;

        let index = RemoteIndex::from_bytes(&compress(json)).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.contains("good"));
    }

    #[test]
    fn non_object_document_is_empty() {
        let index = RemoteIndex::from_bytes(&compress("[1, 2, 3]")).unwrap();
        assert!(index.is_empty());

        let index = RemoteIndex::from_bytes(&compress("null")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result = RemoteIndex::from_bytes(b"definitely not brotli \xff\xfe");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_json_is_reported() {
        let result = RemoteIndex::from_bytes(&compress("{not json"));
        assert!(matches!(result, Err(IndexError::Json(_))));
    }
}
