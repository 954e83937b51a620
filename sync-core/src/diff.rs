//! Local-versus-remote categorization.
//!
//! Every remote name seen on either side lands in exactly one category:
//!
//! - **Update**: no remote entry, or the hash differs, or the mode differs
//! - **Keep**: hash and mode agree; the remote mtime is retained
//! - **Remove**: present remotely, absent locally
//!
//! This module is pure. Hashing happens before it is called; uploading and
//! deleting happen after.

use std::collections::BTreeMap;
use sync_types::{IndexEntry, RemoteIndex};

/// A local asset together with the index entry describing its content.
#[derive(Debug, Clone)]
pub struct Hashed<A> {
    /// The asset itself (content locator, source, ...).
    pub asset: A,
    /// Hash, size, mode and mtime of the local content.
    pub entry: IndexEntry,
}

/// Category of a remote name for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Upload (new or changed content or mode).
    Update,
    /// Leave as is.
    Keep,
    /// Delete remotely.
    Remove,
}

/// One categorized remote name.
#[derive(Debug, Clone)]
pub enum Change<A> {
    /// Upload this asset.
    Update(A),
    /// Unchanged; the entry carries forward into the next index.
    Keep(IndexEntry),
    /// Delete; the entry is the one from the previous index.
    Remove(IndexEntry),
}

impl<A> Change<A> {
    /// The category of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Update(_) => ChangeKind::Update,
            Change::Keep(_) => ChangeKind::Keep,
            Change::Remove(_) => ChangeKind::Remove,
        }
    }
}

/// The three-way partition of `local names ∪ remote names`.
#[derive(Debug, Clone)]
pub struct Diff<A> {
    /// Assets to upload.
    pub update: BTreeMap<String, Hashed<A>>,
    /// Assets left untouched.
    pub keep: BTreeMap<String, IndexEntry>,
    /// Remote names to delete.
    pub remove: BTreeMap<String, IndexEntry>,
}

impl<A> Diff<A> {
    /// True when nothing needs uploading or deleting.
    pub fn is_noop(&self) -> bool {
        self.update.is_empty() && self.remove.is_empty()
    }

    /// The index describing the remote after this diff is applied
    /// (`update ∪ keep`, never `remove`).
    pub fn next_index(&self) -> RemoteIndex {
        self.update
            .iter()
            .map(|(name, hashed)| (name.clone(), hashed.entry.clone()))
            .chain(
                self.keep
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.clone())),
            )
            .collect()
    }
}

/// Categorize hashed local assets against the remote index.
pub fn diff_assets<A>(locals: BTreeMap<String, Hashed<A>>, remote: &RemoteIndex) -> Diff<A> {
    let mut update = BTreeMap::new();
    let mut keep = BTreeMap::new();

    for (name, local) in locals {
        match remote.get(&name) {
            Some(existing)
                if existing.hash == local.entry.hash && existing.mode == local.entry.mode =>
            {
                let entry = IndexEntry {
                    mtime: existing.mtime,
                    ..local.entry
                };
                keep.insert(name, entry);
            }
            _ => {
                update.insert(name, local);
            }
        }
    }

    let remove = remote
        .iter()
        .filter(|(name, _)| !update.contains_key(*name) && !keep.contains_key(*name))
        .map(|(name, entry)| (name.clone(), entry.clone()))
        .collect();

    Diff {
        update,
        keep,
        remove,
    }
}

/// Merge the three categories into one map in remote-name order.
pub fn merge_changes<A>(
    update: BTreeMap<String, A>,
    keep: BTreeMap<String, IndexEntry>,
    remove: BTreeMap<String, IndexEntry>,
) -> BTreeMap<String, Change<A>> {
    let mut changes = BTreeMap::new();
    changes.extend(update.into_iter().map(|(n, a)| (n, Change::Update(a))));
    changes.extend(keep.into_iter().map(|(n, e)| (n, Change::Keep(e))));
    changes.extend(remove.into_iter().map(|(n, e)| (n, Change::Remove(e))));
    changes
}
