//! In-memory content cell.

use std::fmt;
use std::sync::OnceLock;

/// Loaded or generated content, readable as bytes or as text.
///
/// A `Data` is built from either raw bytes or a string. Reading it in the
/// other representation converts once and caches the result; the cell is
/// never modified after that. Text-backed data exposes its UTF-8 bytes
/// directly. Byte-backed data decodes lossily (invalid sequences become
/// U+FFFD).
#[derive(Clone)]
pub struct Data {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Bytes { bytes: Vec<u8>, text: OnceLock<String> },
    Text(String),
}

impl Data {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            repr: Repr::Bytes {
                bytes,
                text: OnceLock::new(),
            },
        }
    }

    /// Wrap a string.
    pub fn from_string(text: String) -> Self {
        Self {
            repr: Repr::Text(text),
        }
    }

    /// Content as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Bytes { bytes, .. } => bytes,
            Repr::Text(text) => text.as_bytes(),
        }
    }

    /// Content as text, decoded on first access.
    pub fn as_str(&self) -> &str {
        match &self.repr {
            Repr::Bytes { bytes, text } => {
                text.get_or_init(|| String::from_utf8_lossy(bytes).into_owned())
            }
            Repr::Text(text) => text,
        }
    }

    /// Consume the cell and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.repr {
            Repr::Bytes { bytes, .. } => bytes,
            Repr::Text(text) => text.into_bytes(),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Self::from_string(text)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Self::from_string(text.to_string())
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.repr {
            Repr::Bytes { .. } => "bytes",
            Repr::Text(_) => "text",
        };
        f.debug_struct("Data")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}
