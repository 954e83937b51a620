//! Error types for sync-content.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during content operations.
#[derive(Error, Debug)]
pub enum ContentError {
    /// Reading a local file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Compression failed.
    #[error("{codec} compression failed: {source}")]
    Compress {
        /// Name of the codec.
        codec: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A blocking worker task panicked or was cancelled.
    #[error("content task failed: {0}")]
    Task(String),

    /// Unknown codec name.
    #[error("unknown transform {0:?} (expected \"gzip\" or \"brotli\")")]
    UnknownCodec(String),
}
