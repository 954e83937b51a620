//! # sync-core
//!
//! Pure reconciliation logic for distsync (no I/O of its own, instant tests).
//!
//! This crate decides *what* a run should do. Given hashed local assets and
//! the remote index it produces the categorized diff, the ordered folder plan
//! and the phase transitions of a run.
//!
//! ## Design Philosophy
//!
//! Every module here takes input and produces output without side effects.
//! The only asynchrony is in [`rules`], where user-supplied transforms and
//! resolvers may await; the crate never touches the network or the disk.
//!
//! The actual I/O (scanning, hashing, uploading) is performed by
//! `sync-client`, which feeds the results through these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
mod error;
pub mod folders;
pub mod phase;
pub mod rules;

pub use diff::{diff_assets, merge_changes, Change, ChangeKind, Diff, Hashed};
pub use error::RuleError;
pub use folders::{plan_folders, FolderPlan};
pub use phase::{Action, Phase, RunEvent};
pub use rules::{
    resolve_remote_name, transforms_for, Matcher, Pattern, RemoteNameFn, Rule, TransformFn,
};
