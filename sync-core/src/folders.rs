//! Directory lifecycle reconciliation.
//!
//! Folders are never stored. They are derived from the ancestors of asset
//! names on both sides of a diff:
//!
//! - `old` folders: ancestors of every name that existed before (`Keep ∪ Remove`)
//! - `new` folders: ancestors of every name that exists after (`Keep ∪ Update`)
//!
//! Creations are `new − old`, parents first. Removals are `old − new`,
//! children first.

use std::collections::BTreeSet;
use sync_types::{ancestors, depth};

use crate::diff::ChangeKind;

/// Ordered folder operations for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPlan {
    /// Folders to create, shallowest first.
    pub create: Vec<String>,
    /// Folders to remove, deepest first.
    pub remove: Vec<String>,
}

impl FolderPlan {
    /// True when no folder needs to change.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.remove.is_empty()
    }
}

/// Plan folder creations and removals from categorized remote names.
pub fn plan_folders<'a, I>(changes: I) -> FolderPlan
where
    I: IntoIterator<Item = (&'a str, ChangeKind)>,
{
    let mut old = BTreeSet::new();
    let mut new = BTreeSet::new();

    for (name, kind) in changes {
        for folder in ancestors(name) {
            if kind != ChangeKind::Update {
                old.insert(folder);
            }
            if kind != ChangeKind::Remove {
                new.insert(folder);
            }
        }
    }

    let mut create: Vec<String> = new.difference(&old).map(|f| f.to_string()).collect();
    let mut remove: Vec<String> = old.difference(&new).map(|f| f.to_string()).collect();

    sort_parents_first(&mut create);
    sort_parents_first(&mut remove);
    remove.reverse();

    FolderPlan { create, remove }
}

fn sort_parents_first(folders: &mut [String]) {
    folders.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));
}
