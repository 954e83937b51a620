//! Local filesystem backend (`file:` remotes).

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A remote directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsTransport {
    root: PathBuf,
}

impl FsTransport {
    /// Open `root`, creating it and its parents if needed.
    pub async fn connect(root: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let root = root.into();
        debug!(root = %root.display(), "opening filesystem remote");
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| TransportError::from_io(&root.to_string_lossy(), e))?;
        Ok(Self { root })
    }

    /// The remote root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(name.split('/').filter(|s| !s.is_empty()));
        path
    }
}

#[async_trait]
impl Transport for FsTransport {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        tokio::fs::read(self.path(name))
            .await
            .map_err(|e| TransportError::from_io(name, e))
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        tokio::fs::write(self.path(name), data)
            .await
            .map_err(|e| TransportError::from_io(name, e))
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        tokio::fs::remove_file(self.path(name))
            .await
            .map_err(|e| TransportError::from_io(name, e))
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        tokio::fs::create_dir(self.path(name))
            .await
            .map_err(|e| TransportError::from_io(name, e))
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        tokio::fs::remove_dir(self.path(name))
            .await
            .map_err(|e| TransportError::from_io(name, e))
    }

    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError> {
        let path = self.path(name);

        #[cfg(unix)]
        let result = {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).await
        };

        // Permission bits are not representable here; only check existence.
        #[cfg(not(unix))]
        let result = {
            let _ = mode;
            tokio::fs::metadata(&path).await.map(|_| ())
        };

        result.map_err(|e| TransportError::from_io(name, e))
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b/remote");

        let transport = FsTransport::connect(&root).await.unwrap();

        assert!(root.is_dir());
        assert_eq!(transport.root(), root);
    }

    #[tokio::test]
    async fn object_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FsTransport::connect(dir.path()).await.unwrap();

        transport.mkdir("docs").await.unwrap();
        transport.put("docs/a.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(transport.get("docs/a.txt").await.unwrap(), b"hello");
        assert_eq!(std::fs::read(dir.path().join("docs/a.txt")).unwrap(), b"hello");

        transport.rm("docs/a.txt").await.unwrap();
        transport.rmdir("docs").await.unwrap();
        assert!(!dir.path().join("docs").exists());
    }

    #[tokio::test]
    async fn special_characters_in_names() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FsTransport::connect(dir.path()).await.unwrap();

        transport.put("a?b#c%20.txt", b"x".to_vec()).await.unwrap();
        assert!(dir.path().join("a?b#c%20.txt").is_file());
    }

    #[tokio::test]
    async fn error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FsTransport::connect(dir.path()).await.unwrap();

        assert!(matches!(
            transport.get("missing").await,
            Err(TransportError::NotFound(_))
        ));

        transport.mkdir("d").await.unwrap();
        assert!(matches!(
            transport.mkdir("d").await,
            Err(TransportError::AlreadyExists(_))
        ));

        transport.put("d/f", vec![1]).await.unwrap();
        assert!(transport.rmdir("d").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn chmod_sets_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let transport = FsTransport::connect(dir.path()).await.unwrap();
        transport.put("run.sh", b"#!/bin/sh".to_vec()).await.unwrap();

        transport.chmod("run.sh", 0o700).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("run.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
