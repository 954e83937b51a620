//! Content hashing.
//!
//! Asset identity in the remote index is the base64 (standard alphabet,
//! padded) SHA-256 of the full local content. Files are hashed in chunks so
//! large assets are never buffered whole.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::ContentError;

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Hash a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Hash a file by streaming its contents.
pub async fn hash_file(path: &Path) -> Result<String, ContentError> {
    let read_error = |source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await.map_err(read_error)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(STANDARD.encode(hasher.finalize()))
}
