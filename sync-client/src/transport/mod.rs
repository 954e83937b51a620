//! Transport abstraction for distsync.
//!
//! This module provides a pluggable transport layer that abstracts the remote
//! directory being synchronized (local filesystem, WebDAV, FTP, mock for
//! testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented. A connection is
//! established by [`crate::connect::connect`], used for the whole run, and
//! released with `close()` on every exit path:
//! - `get()` fetches an object
//! - `put()` stores an object
//! - `rm()` deletes an object
//! - `mkdir()` / `rmdir()` manage folders
//! - `chmod()` sets permission bits where the backend supports them
//!
//! Calls are issued sequentially; implementations do not need to support
//! concurrent operations on one connection.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.put("index.html", b"<p>hi</p>".to_vec()).await?;
//! let bytes = transport.get("index.html").await?;
//! transport.close().await;
//! ```

mod dry_run;
mod fs;
mod ftp;
mod mock;
mod webdav;

pub use dry_run::DryRunTransport;
pub use fs::FsTransport;
pub use ftp::FtpTransport;
pub use mock::{Call, MockTransport};
pub use webdav::WebDavTransport;

use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// Login credentials for WebDAV and FTP remotes.
#[derive(Clone)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The object or folder does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The folder already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The folder still has entries.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// The backend cannot perform this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Local I/O failed.
    #[error("{name}: {source}")]
    Io {
        /// Remote name the operation was about.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The HTTP request failed or returned an error status.
    #[error("http error: {0}")]
    Http(String),

    /// The FTP server refused a command or replied unexpectedly.
    #[error("ftp error: {0}")]
    Ftp(String),
}

impl TransportError {
    /// Classify an I/O error about `name`.
    pub fn from_io(name: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(name.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(name.to_string()),
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty(name.to_string()),
            io::ErrorKind::Unsupported => Self::Unsupported(name.to_string()),
            _ => Self::Io {
                name: name.to_string(),
                source,
            },
        }
    }
}

/// The remote directory capability consumed by a run.
///
/// Names are remote names (normalized, slash-separated, relative to the
/// remote root).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the full content of an object.
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError>;

    /// Store an object, replacing any existing one.
    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError>;

    /// Delete an object.
    async fn rm(&self, name: &str) -> Result<(), TransportError>;

    /// Create a folder whose parent exists.
    async fn mkdir(&self, name: &str) -> Result<(), TransportError>;

    /// Remove an empty folder.
    async fn rmdir(&self, name: &str) -> Result<(), TransportError>;

    /// Set permission bits on an object.
    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError>;

    /// Release the connection. Never fails.
    async fn close(&self);
}

#[async_trait]
impl<'a, T: Transport + ?Sized> Transport for &'a T {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        (**self).get(name).await
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        (**self).put(name, data).await
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        (**self).rm(name).await
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        (**self).mkdir(name).await
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        (**self).rmdir(name).await
    }

    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError> {
        (**self).chmod(name, mode).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        (**self).get(name).await
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        (**self).put(name, data).await
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        (**self).rm(name).await
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        (**self).mkdir(name).await
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        (**self).rmdir(name).await
    }

    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError> {
        (**self).chmod(name, mode).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
