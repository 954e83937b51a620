//! Error types for the index document.

use thiserror::Error;

/// Errors that can occur while encoding or decoding the remote index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Brotli compression failed
    #[error("index compression failed: {0}")]
    Compress(#[source] std::io::Error),

    /// Brotli decompression failed (truncated or not brotli)
    #[error("index decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// The decompressed document is not valid JSON
    #[error("index is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
