//! # sync-client
//!
//! Runs distsync: scan local sources, compare them against the remote index,
//! and upload only what changed.
//!
//! ## Features
//!
//! - **Content-addressed diffing**: SHA-256 hashes plus permission bits decide
//!   what gets uploaded; the remote is never listed
//! - **Per-source rules**: glob and regex tests, gzip/brotli or custom
//!   transforms, remote-name rewrites
//! - **Transport Abstraction**: local filesystem, WebDAV and FTP backends,
//!   plus a mock for tests
//! - **Dry runs**: the full plan is narrated with no remote mutation
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use distsync_client::{parse_remote, run, Source, SyncConfig};
//!
//! let remote = parse_remote("https://user@dav.example.com/site/", &cwd)?;
//! let config = SyncConfig::new(remote)
//!     .with_source(Source::new("dist"))
//!     .with_password(password);
//! let report = run(&config).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod assets;
pub mod config;
pub mod connect;
mod error;
pub mod scan;
pub mod sync;
pub mod transform;
pub mod transport;

pub use apply::Operation;
pub use config::{Progress, Source, SyncConfig};
pub use connect::{connect, parse_remote};
pub use error::ClientError;
pub use sync::{run, run_with_transport, SyncReport};
pub use transport::{
    Credentials, DryRunTransport, FsTransport, FtpTransport, MockTransport, Transport,
    TransportError, WebDavTransport,
};
