//! Mutation applier.
//!
//! Issues remote operations one at a time over a single transport. Folder
//! operations are best-effort: failures are logged and the run continues.
//! Asset operations are fatal: the first failure ends the run.

use std::collections::BTreeMap;
use std::fmt;
use sync_content::{Content, Data};
use sync_core::Change;
use sync_types::{RemoteIndex, INDEX_MODE};
use tracing::warn;

use crate::config::SyncConfig;
use crate::error::ClientError;
use crate::transform::Upload;
use crate::transport::{Transport, TransportError};

/// One remote operation, performed or (in dry runs) planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a folder.
    Mkdir(String),
    /// Upload an object.
    Upload(String),
    /// Set permission bits on an object.
    Chmod(String, u32),
    /// Delete an object.
    Rm(String),
    /// Remove a folder.
    Rmdir(String),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Mkdir(name) => write!(f, "mkdir {name}"),
            Operation::Upload(name) => write!(f, "upload {name}"),
            Operation::Chmod(name, mode) => write!(f, "chmod {mode:o} {name}"),
            Operation::Rm(name) => write!(f, "rm {name}"),
            Operation::Rmdir(name) => write!(f, "rmdir {name}"),
        }
    }
}

/// Applies operations through a transport and keeps the operation log.
pub struct Applier<'a, T: ?Sized> {
    transport: &'a T,
    config: &'a SyncConfig,
    operations: Vec<Operation>,
}

impl<'a, T: Transport + ?Sized> Applier<'a, T> {
    /// Create an applier over a connected transport.
    pub fn new(transport: &'a T, config: &'a SyncConfig) -> Self {
        Self {
            transport,
            config,
            operations: Vec::new(),
        }
    }

    fn record(&mut self, operation: Operation) {
        self.config.info(&operation.to_string());
        self.operations.push(operation);
    }

    /// Create folders in order, logging failures.
    pub async fn create_folders(&mut self, folders: &[String]) {
        for folder in folders {
            self.record(Operation::Mkdir(folder.clone()));
            if let Err(e) = self.transport.mkdir(folder).await {
                warn!(folder = %folder, error = %e, "mkdir failed");
            }
        }
    }

    /// Remove folders in order, logging failures.
    pub async fn remove_folders(&mut self, folders: &[String]) {
        for folder in folders {
            self.record(Operation::Rmdir(folder.clone()));
            if let Err(e) = self.transport.rmdir(folder).await {
                warn!(folder = %folder, error = %e, "rmdir failed");
            }
        }
    }

    /// Upload content, then set its mode.
    pub async fn upload(
        &mut self,
        name: &str,
        content: Content,
        mode: u32,
    ) -> Result<(), ClientError> {
        self.record(Operation::Upload(name.to_string()));
        let data = content.load().await?;
        self.transport
            .put(name, data.into_bytes())
            .await
            .map_err(asset_error("upload", name))?;

        self.record(Operation::Chmod(name.to_string(), mode));
        self.transport
            .chmod(name, mode)
            .await
            .map_err(asset_error("chmod", name))
    }

    /// Delete an object.
    pub async fn remove(&mut self, name: &str) -> Result<(), ClientError> {
        self.record(Operation::Rm(name.to_string()));
        self.transport
            .rm(name)
            .await
            .map_err(asset_error("rm", name))
    }

    /// Apply every change in name order; kept assets are skipped.
    pub async fn apply_assets(
        &mut self,
        changes: BTreeMap<String, Change<Upload>>,
    ) -> Result<(), ClientError> {
        for (name, change) in changes {
            match change {
                Change::Update(upload) => {
                    self.upload(&name, upload.content, upload.mode).await?
                }
                Change::Remove(_) => self.remove(&name).await?,
                Change::Keep(_) => {}
            }
        }
        Ok(())
    }

    /// Upload the rebuilt index as a regular asset.
    pub async fn save_index(
        &mut self,
        name: &str,
        index: &RemoteIndex,
    ) -> Result<(), ClientError> {
        let bytes = index.to_bytes()?;
        self.upload(name, Content::Data(Data::from_bytes(bytes)), INDEX_MODE)
            .await
    }

    /// The operations issued so far.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Consume the applier and return its log.
    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

fn asset_error<'a>(
    op: &'static str,
    name: &'a str,
) -> impl FnOnce(TransportError) -> ClientError + 'a {
    move |source| ClientError::Asset {
        op,
        name: name.to_string(),
        source,
    }
}
