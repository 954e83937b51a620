//! Client errors.

use std::path::PathBuf;
use sync_content::ContentError;
use sync_core::RuleError;
use sync_types::IndexError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that end a run.
///
/// A missing or unreadable remote index and failed folder operations are not
/// errors; they are logged and the run continues.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote URL scheme has no backend.
    #[error("unsupported protocol: {0}")]
    UnsupportedTransport(String),

    /// Connecting to the remote failed.
    #[error("connection failed: {0}")]
    Connect(#[source] TransportError),

    /// An asset operation (upload, chmod, delete) failed.
    #[error("{op} {name} failed: {source}")]
    Asset {
        /// Operation name.
        op: &'static str,
        /// Remote name.
        name: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// Encoding the index failed.
    #[error("cannot encode index: {0}")]
    Index(#[from] IndexError),

    /// Reading, hashing or transforming local content failed.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// A remote-name resolver or transform failed.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Walking a source directory failed.
    #[error("cannot scan {}: {source}", path.display())]
    Scan {
        /// The path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
