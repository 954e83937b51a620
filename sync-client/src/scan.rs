//! Local directory scanning.
//!
//! [`Scanner`] walks a source directory depth-first with an explicit stack,
//! so arbitrarily deep trees never grow the call stack. Entries are visited in
//! file-name order; only regular files (or what symlinks resolve to) are
//! yielded, never directories.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use sync_types::normalize_path;

use crate::error::ClientError;

/// A regular file found under a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Slash-separated, normalized path relative to the source root.
    pub local_name: String,
    /// Path on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits (`mode & 0o777`).
    pub mode: u32,
    /// Modification time in whole milliseconds since the epoch.
    pub mtime: i64,
}

/// Lazy depth-first walk over a directory.
#[derive(Debug)]
pub struct Scanner {
    stack: Vec<(PathBuf, String)>,
}

impl Scanner {
    /// Start a walk at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![(root.into(), String::new())],
        }
    }

    /// The next file, or `None` when the walk is done.
    pub async fn next(&mut self) -> Result<Option<ScannedFile>, ClientError> {
        while let Some((path, local_name)) = self.stack.pop() {
            let meta = tokio::fs::metadata(&path).await.map_err(scan_error(&path))?;

            if !meta.is_dir() {
                let local_name = if local_name.is_empty() {
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default()
                } else {
                    local_name
                };
                return Ok(Some(ScannedFile {
                    local_name: normalize_path(&local_name),
                    size: meta.len(),
                    mode: permission_bits(&meta),
                    mtime: meta.modified().map(epoch_millis).unwrap_or(0),
                    path,
                }));
            }

            let mut entries = tokio::fs::read_dir(&path)
                .await
                .map_err(scan_error(&path))?;
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(scan_error(&path))? {
                children.push(entry.file_name());
            }
            children.sort();

            // Reversed so the smallest name is popped first
            for child in children.into_iter().rev() {
                let name = child.to_string_lossy();
                let child_local = if local_name.is_empty() {
                    name.into_owned()
                } else {
                    format!("{local_name}/{name}")
                };
                self.stack.push((path.join(&child), child_local));
            }
        }
        Ok(None)
    }

    /// Drain the walk into a vector.
    pub async fn collect(mut self) -> Result<Vec<ScannedFile>, ClientError> {
        let mut files = Vec::new();
        while let Some(file) = self.next().await? {
            files.push(file);
        }
        Ok(files)
    }
}

fn scan_error(path: &Path) -> impl Fn(std::io::Error) -> ClientError + '_ {
    move |source| ClientError::Scan {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Milliseconds since the epoch, floored.
fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(e) => {
            let d = e.duration();
            let millis = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
            if d.subsec_nanos() % 1_000_000 == 0 {
                -millis
            } else {
                -millis - 1
            }
        }
    }
}
