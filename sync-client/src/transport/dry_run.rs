//! Read-only wrapper for dry runs.

use super::{Transport, TransportError};
use async_trait::async_trait;

/// Forwards reads to the wrapped transport and turns every mutation into a
/// successful no-op.
#[derive(Debug, Clone)]
pub struct DryRunTransport<T> {
    inner: T,
}

impl<T: Transport> DryRunTransport<T> {
    /// Wrap a connected transport.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for DryRunTransport<T> {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        self.inner.get(name).await
    }

    async fn put(&self, _name: &str, _data: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn rm(&self, _name: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn mkdir(&self, _name: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn rmdir(&self, _name: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn chmod(&self, _name: &str, _mode: u32) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Call, MockTransport};

    #[tokio::test]
    async fn reads_pass_through_and_writes_vanish() {
        let mock = MockTransport::new();
        mock.insert(".htdistsync", "index");
        let dry = DryRunTransport::new(mock.clone());

        assert_eq!(dry.get(".htdistsync").await.unwrap(), b"index");
        dry.mkdir("a").await.unwrap();
        dry.put("a/b", vec![1]).await.unwrap();
        dry.chmod("a/b", 0o644).await.unwrap();
        dry.rm("old").await.unwrap();
        dry.rmdir("a").await.unwrap();
        dry.close().await;

        assert_eq!(
            mock.calls(),
            vec![Call::Get(".htdistsync".into()), Call::Close]
        );
        assert!(mock.folders().is_empty());
    }
}
