// ── Session notifications ──

use strum::Display;

use crate::model::{EntityId, Point};
use crate::store::Deletion;

/// Broadcast to session subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A device moved locally (drag, undo or redo) and will be pushed.
    DevicePositionChanged { device_id: EntityId, position: Point },
    /// A reconciliation pass began sending `changes` writes.
    ReconcileStarted { changes: usize },
    /// A pass succeeded and the canonical view was refreshed.
    ReconcileCompleted {
        devices: usize,
        created: usize,
        updated: usize,
    },
    /// A pass aborted. Local edits are intact and still pending.
    ReconcileFailed { message: String },
    /// A remote deletion was refused; the entity reappears on the next
    /// refresh.
    DeletionFailed { deletion: Deletion, message: String },
}

/// Where the background reconciliation currently stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Display)]
pub enum SyncStatus {
    /// Nothing pending, or nothing left to push.
    #[default]
    Idle,
    /// Waiting out the debounce window.
    Scheduled,
    /// A pass is in flight.
    Reconciling,
    /// The last pass failed; the session is unsaved.
    #[strum(to_string = "Failed: {message}")]
    Failed { message: String },
}

impl SyncStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
