//! # sync-content
//!
//! Content handling for distsync.
//!
//! Local assets are addressed by the SHA-256 of their bytes. This crate
//! provides the pieces that touch those bytes:
//!
//! - [`Data`]: an in-memory content cell readable as bytes or text
//! - [`Content`]: a locator that is either an unread file or loaded [`Data`]
//! - [`hash_file`] / [`hash_bytes`]: base64 SHA-256, streamed for files
//! - [`Codec`]: the built-in `gzip` and `brotli` transforms
//!
//! ## Example
//!
//! ```rust,ignore
//! use distsync_content::{Codec, Content, hash_file};
//!
//! let hash = hash_file(&path).await?;
//! let data = Content::File(path).load().await?;
//! let gzipped = Codec::Gzip.apply(data).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod content;
mod data;
mod error;
mod hash;

pub use codec::Codec;
pub use content::Content;
pub use data::Data;
pub use error::ContentError;
pub use hash::{hash_bytes, hash_file};
