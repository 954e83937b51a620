//! Per-run phase state machine.
//!
//! A run walks a fixed sequence of phases:
//!
//! ```text
//! Scan → Diff → Transform → PlanFolders → CreateFolders → ApplyAssets
//!      → RemoveFolders → SaveIndex → Completed
//! ```
//!
//! `Diff` may short-circuit to `Completed` when nothing changed, and any
//! non-terminal phase moves to `Aborted` on failure. The machine only decides
//! transitions and the narrative to print; sync-client performs the work.

/// Phase of one run - NO I/O, just transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting local assets and loading the remote index.
    Scan,
    /// Hashing locals and categorizing against the index.
    Diff,
    /// Running content transforms for changed assets.
    Transform,
    /// Computing folder creations and removals.
    PlanFolders,
    /// Creating folders (best-effort).
    CreateFolders,
    /// Uploading and deleting assets (fatal on failure).
    ApplyAssets,
    /// Removing folders (best-effort).
    RemoveFolders,
    /// Uploading the rebuilt index.
    SaveIndex,
    /// The run finished.
    Completed,
    /// The run stopped on an unrecovered error.
    Aborted,
}

impl Phase {
    /// The phase every run starts in.
    pub fn new() -> Self {
        Self::Scan
    }

    /// Process an event and return the next phase plus actions to execute.
    pub fn on_event(self, event: RunEvent) -> (Self, Vec<Action>) {
        match (self, event) {
            (phase, _) if phase.is_terminal() => (phase, vec![]),

            (_, RunEvent::Failed) => (Self::Aborted, vec![]),

            (Self::Diff, RunEvent::NothingToDo) => {
                (Self::Completed, vec![Action::Announce("Nothing to do.")])
            }

            (Self::Scan, RunEvent::Advanced) => (
                Self::Diff,
                vec![Action::Announce("Comparing local against remote...")],
            ),
            (Self::Diff, RunEvent::Advanced) => (
                Self::Transform,
                vec![Action::Announce("Preparing local assets...")],
            ),
            (Self::Transform, RunEvent::Advanced) => (Self::PlanFolders, vec![]),
            (Self::PlanFolders, RunEvent::Advanced) => {
                (Self::CreateFolders, vec![Action::Announce("Uploading...")])
            }
            (Self::CreateFolders, RunEvent::Advanced) => (Self::ApplyAssets, vec![]),
            (Self::ApplyAssets, RunEvent::Advanced) => (Self::RemoveFolders, vec![]),
            (Self::RemoveFolders, RunEvent::Advanced) => (Self::SaveIndex, vec![]),
            (Self::SaveIndex, RunEvent::Advanced) => {
                (Self::Completed, vec![Action::Announce("Completed.")])
            }

            // Short-circuit is only meaningful right after diffing
            (phase, RunEvent::NothingToDo) => (phase, vec![]),

            (phase, RunEvent::Advanced) => (phase, vec![]),
        }
    }

    /// Check if the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::new()
    }
}

/// Events reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// The current phase finished its work.
    Advanced,
    /// The diff contains no update and no removal.
    NothingToDo,
    /// An unrecovered error occurred.
    Failed,
}

/// Actions for the orchestrator to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Emit a progress message.
    Announce(&'static str),
}
