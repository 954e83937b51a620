//! Mock transport for testing.
//!
//! Holds remote objects in memory, records every call for verification and
//! can be told to fail the next call of a given kind.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `get(name)`
    Get(String),
    /// `put(name, ..)`
    Put(String),
    /// `rm(name)`
    Rm(String),
    /// `mkdir(name)`
    Mkdir(String),
    /// `rmdir(name)`
    Rmdir(String),
    /// `chmod(name, mode)`
    Chmod(String, u32),
    /// `close()`
    Close,
}

impl Call {
    /// True for calls that change the remote.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Get(_) | Call::Close)
    }
}

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the run owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    objects: BTreeMap<String, Vec<u8>>,
    modes: BTreeMap<String, u32>,
    folders: BTreeSet<String>,
    calls: Vec<Call>,
    fail_next_get: Option<String>,
    fail_next_put: Option<String>,
    fail_next_rm: Option<String>,
    fail_next_mkdir: Option<String>,
    fail_next_rmdir: Option<String>,
    fail_next_chmod: Option<String>,
}

impl MockTransport {
    /// Create a new, empty mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a remote object without recording a call.
    pub fn insert(&self, name: &str, data: impl Into<Vec<u8>>) {
        let mut inner = self.lock();
        inner.objects.insert(name.to_string(), data.into());
    }

    /// Seed a remote folder without recording a call.
    pub fn insert_folder(&self, name: &str) {
        let mut inner = self.lock();
        inner.folders.insert(name.to_string());
    }

    /// Content of a remote object.
    pub fn object(&self, name: &str) -> Option<Vec<u8>> {
        let inner = self.lock();
        inner.objects.get(name).cloned()
    }

    /// Names of all remote objects.
    pub fn object_names(&self) -> Vec<String> {
        let inner = self.lock();
        inner.objects.keys().cloned().collect()
    }

    /// Names of all remote folders.
    pub fn folders(&self) -> Vec<String> {
        let inner = self.lock();
        inner.folders.iter().cloned().collect()
    }

    /// Last mode set on an object.
    pub fn mode(&self, name: &str) -> Option<u32> {
        let inner = self.lock();
        inner.modes.get(name).copied()
    }

    /// Get all calls in the order they were made.
    pub fn calls(&self) -> Vec<Call> {
        let inner = self.lock();
        inner.calls.clone()
    }

    /// Cause the next get() to fail with the given error.
    pub fn fail_next_get(&self, error: &str) {
        self.lock().fail_next_get = Some(error.to_string());
    }

    /// Cause the next put() to fail with the given error.
    pub fn fail_next_put(&self, error: &str) {
        self.lock().fail_next_put = Some(error.to_string());
    }

    /// Cause the next rm() to fail with the given error.
    pub fn fail_next_rm(&self, error: &str) {
        self.lock().fail_next_rm = Some(error.to_string());
    }

    /// Cause the next mkdir() to fail with the given error.
    pub fn fail_next_mkdir(&self, error: &str) {
        self.lock().fail_next_mkdir = Some(error.to_string());
    }

    /// Cause the next rmdir() to fail with the given error.
    pub fn fail_next_rmdir(&self, error: &str) {
        self.lock().fail_next_rmdir = Some(error.to_string());
    }

    /// Cause the next chmod() to fail with the given error.
    pub fn fail_next_chmod(&self, error: &str) {
        self.lock().fail_next_chmod = Some(error.to_string());
    }

    /// Forget recorded calls, keeping remote state.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Clear all state (objects, folders, calls, pending failures).
    pub fn reset(&self) {
        *self.lock() = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn forced(name: &str, error: Option<String>) -> Result<(), TransportError> {
    match error {
        Some(error) => Err(TransportError::Io {
            name: name.to_string(),
            source: std::io::Error::other(error),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, name: &str) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Get(name.to_string()));
        forced(name, inner.fail_next_get.take())?;

        inner
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(name.to_string()))
    }

    async fn put(&self, name: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Put(name.to_string()));
        forced(name, inner.fail_next_put.take())?;

        inner.objects.insert(name.to_string(), data);
        Ok(())
    }

    async fn rm(&self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Rm(name.to_string()));
        forced(name, inner.fail_next_rm.take())?;

        inner.modes.remove(name);
        inner
            .objects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| TransportError::NotFound(name.to_string()))
    }

    async fn mkdir(&self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Mkdir(name.to_string()));
        forced(name, inner.fail_next_mkdir.take())?;

        if !inner.folders.insert(name.to_string()) {
            return Err(TransportError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    async fn rmdir(&self, name: &str) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Rmdir(name.to_string()));
        forced(name, inner.fail_next_rmdir.take())?;

        let prefix = format!("{name}/");
        let occupied = inner.objects.keys().any(|k| k.starts_with(&prefix))
            || inner.folders.iter().any(|f| f.starts_with(&prefix));
        if occupied {
            return Err(TransportError::NotEmpty(name.to_string()));
        }
        if !inner.folders.remove(name) {
            return Err(TransportError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn chmod(&self, name: &str, mode: u32) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Chmod(name.to_string(), mode));
        forced(name, inner.fail_next_chmod.take())?;

        if !inner.objects.contains_key(name) {
            return Err(TransportError::NotFound(name.to_string()));
        }
        inner.modes.insert(name.to_string(), mode);
        Ok(())
    }

    async fn close(&self) {
        self.lock().calls.push(Call::Close);
    }
}
