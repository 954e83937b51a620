//! Run orchestration.
//!
//! A run scans local sources, loads the remote index, diffs, transforms,
//! plans folders and applies the result, in the order decided by
//! [`sync_core::Phase`]. The connection is opened once and closed on every
//! exit path.
//!
//! # Example
//!
//! ```ignore
//! use distsync_client::{run, Source, SyncConfig};
//!
//! let config = SyncConfig::new(url)
//!     .with_source(Source::new("dist"))
//!     .with_progress(|line| println!("{line}"));
//! let report = run(&config).await?;
//! println!("{} uploaded", report.uploaded.len());
//! ```

use std::collections::BTreeMap;
use std::iter;
use sync_core::{
    diff_assets, merge_changes, plan_folders, Action, ChangeKind, Phase, RunEvent,
};
use sync_types::normalize_path;
use tracing::debug;

use crate::apply::{Applier, Operation};
use crate::assets::{hash_assets, local_assets, remote_index, LocalAsset};
use crate::config::SyncConfig;
use crate::connect::connect;
use crate::error::ClientError;
use crate::transform::transform_assets;
use crate::transport::{DryRunTransport, Transport};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Remote names uploaded, in name order.
    pub uploaded: Vec<String>,
    /// Remote names deleted, in name order.
    pub removed: Vec<String>,
    /// Number of assets left untouched.
    pub kept: usize,
    /// Every operation issued (planned, in dry runs), in order.
    pub operations: Vec<Operation>,
    /// The phase the run ended in.
    pub phase: Phase,
}

/// Synchronize the configured sources to the configured remote.
pub async fn run(config: &SyncConfig) -> Result<SyncReport, ClientError> {
    let locals = prepare(config).await?;
    let transport = connect(&config.remote, config.password.as_deref()).await?;
    execute(config, locals, transport).await
}

/// Like [`run`], over an already connected transport.
///
/// The transport is closed before this returns.
pub async fn run_with_transport<T: Transport>(
    config: &SyncConfig,
    transport: T,
) -> Result<SyncReport, ClientError> {
    match prepare(config).await {
        Ok(locals) => execute(config, locals, transport).await,
        Err(e) => {
            transport.close().await;
            Err(e)
        }
    }
}

async fn prepare(config: &SyncConfig) -> Result<BTreeMap<String, LocalAsset>, ClientError> {
    let index_name = &config.index_name;
    if index_name.is_empty() || index_name.ends_with('/') || *index_name != normalize_path(index_name)
    {
        return Err(ClientError::Config(format!("invalid index name: {index_name:?}")));
    }

    config.info("Getting local assets...");
    local_assets(config).await
}

async fn execute<T: Transport>(
    config: &SyncConfig,
    locals: BTreeMap<String, LocalAsset>,
    transport: T,
) -> Result<SyncReport, ClientError> {
    let result = if config.dry_run {
        debug!("dry run, mutations disabled");
        reconcile(config, locals, &DryRunTransport::new(&transport)).await
    } else {
        reconcile(config, locals, &transport).await
    };
    transport.close().await;
    result
}

struct Run<'a> {
    config: &'a SyncConfig,
    phase: Phase,
}

impl<'a> Run<'a> {
    fn new(config: &'a SyncConfig) -> Self {
        Self {
            config,
            phase: Phase::new(),
        }
    }

    fn advance(&mut self, event: RunEvent) {
        let (next, actions) = self.phase.on_event(event);
        debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
        for action in actions {
            match action {
                Action::Announce(message) => self.config.info(message),
            }
        }
    }

    fn check<V>(&mut self, result: Result<V, ClientError>) -> Result<V, ClientError> {
        if let Err(e) = &result {
            debug!(phase = ?self.phase, error = %e, "run aborted");
            self.advance(RunEvent::Failed);
        }
        result
    }
}

async fn reconcile<T: Transport + ?Sized>(
    config: &SyncConfig,
    locals: BTreeMap<String, LocalAsset>,
    transport: &T,
) -> Result<SyncReport, ClientError> {
    let mut run = Run::new(config);

    config.info("Getting remote assets...");
    let index = remote_index(transport, &config.index_name).await;
    run.advance(RunEvent::Advanced);

    let hashed = run.check(hash_assets(locals).await)?;
    let diff = diff_assets(hashed, &index);
    for name in diff.update.keys() {
        config.info(&format!("UPLOAD: {name}"));
    }
    for name in diff.remove.keys() {
        config.info(&format!("REMOVE: {name}"));
    }

    let mut report = SyncReport {
        uploaded: diff.update.keys().cloned().collect(),
        removed: diff.remove.keys().cloned().collect(),
        kept: diff.keep.len(),
        operations: Vec::new(),
        phase: run.phase,
    };

    if diff.is_noop() {
        run.advance(RunEvent::NothingToDo);
        report.phase = run.phase;
        return Ok(report);
    }
    run.advance(RunEvent::Advanced);

    let uploads = run.check(transform_assets(config, &diff.update).await)?;
    run.advance(RunEvent::Advanced);

    let next_index = diff.next_index();
    let changes = merge_changes(uploads, diff.keep, diff.remove);
    let plan = plan_folders(
        changes
            .iter()
            .map(|(name, change)| (name.as_str(), change.kind()))
            .chain(iter::once((config.index_name.as_str(), ChangeKind::Update))),
    );
    debug!(create = plan.create.len(), remove = plan.remove.len(), "folder plan");
    run.advance(RunEvent::Advanced);

    let mut applier = Applier::new(transport, config);
    applier.create_folders(&plan.create).await;
    run.advance(RunEvent::Advanced);

    run.check(applier.apply_assets(changes).await)?;
    run.advance(RunEvent::Advanced);

    applier.remove_folders(&plan.remove).await;
    run.advance(RunEvent::Advanced);

    run.check(applier.save_index(&config.index_name, &next_index).await)?;
    run.advance(RunEvent::Advanced);

    report.operations = applier.into_operations();
    report.phase = run.phase;
    Ok(report)
}
