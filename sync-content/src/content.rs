//! Content locators.

use std::path::{Path, PathBuf};

use crate::data::Data;
use crate::error::ContentError;

/// Where an asset's bytes come from.
///
/// Scanned assets start as [`Content::File`] and are only read when a
/// transform needs them or when they are uploaded.
#[derive(Debug, Clone)]
pub enum Content {
    /// Unread local file.
    File(PathBuf),
    /// Content already in memory (loaded or transformed).
    Data(Data),
}

impl Content {
    /// Local path if the content has not been loaded.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Content::File(path) => Some(path),
            Content::Data(_) => None,
        }
    }

    /// Materialize the content.
    pub async fn load(self) -> Result<Data, ContentError> {
        match self {
            Content::File(path) => tokio::fs::read(&path)
                .await
                .map(Data::from_bytes)
                .map_err(|source| ContentError::Read { path, source }),
            Content::Data(data) => Ok(data),
        }
    }
}

impl From<Data> for Content {
    fn from(data: Data) -> Self {
        Content::Data(data)
    }
}
