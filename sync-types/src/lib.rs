//! # sync-types
//!
//! Shared types for distsync.
//!
//! This crate provides the foundational types used across all distsync crates:
//! - [`normalize_path`], [`ancestors`] - Remote-name normalization and folder derivation
//! - [`IndexEntry`], [`RemoteIndex`] - The persisted remote index and its document format
//! - [`IndexError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod index;
mod path;

pub use error::IndexError;
pub use index::{IndexEntry, RemoteIndex, DEFAULT_INDEX_NAME, INDEX_MODE};
pub use path::{ancestors, depth, normalize_path};
