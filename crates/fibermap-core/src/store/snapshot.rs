// ── Snapshots and undo/redo ──
//
// A snapshot is a deep copy of the persisted side of the session:
// canonical cables, the overlay, devices and the pending-device list.
// Restoring merges it onto the live canonical data rather than replacing
// it, so cables and devices deleted since are never brought back.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::{OverlayEntry, SessionStore, allocate};
use crate::error::CoreError;
use crate::model::{Cable, Device, EntityId};
use crate::ports::PortAllocator;

/// Immutable capture of the undoable part of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    persisted: IndexMap<EntityId, Cable>,
    overlay: IndexMap<EntityId, OverlayEntry>,
    devices: IndexMap<EntityId, Device>,
    pending_device_updates: IndexSet<EntityId>,
}

impl Snapshot {
    pub fn overlay(&self) -> &IndexMap<EntityId, OverlayEntry> {
        &self.overlay
    }

    pub fn device_position(&self, id: &EntityId) -> Option<crate::model::Point> {
        self.devices.get(id).map(|d| d.position)
    }

    pub fn pending_device_updates(&self) -> impl Iterator<Item = &EntityId> {
        self.pending_device_updates.iter()
    }
}

/// Result of an applied undo or redo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Restoration {
    /// Devices whose position changed; each needs pushing again.
    pub moved_devices: Vec<EntityId>,
}

/// Candidate state computed before anything is committed.
struct Restored {
    overlay: IndexMap<EntityId, OverlayEntry>,
    devices: IndexMap<EntityId, Device>,
    pending_device_updates: IndexSet<EntityId>,
    allocator: PortAllocator,
    moved_devices: Vec<EntityId>,
}

impl SessionStore {
    /// Deep copy of the undoable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            persisted: self.persisted.clone(),
            overlay: self.overlay.clone(),
            devices: self.devices.clone(),
            pending_device_updates: self.pending_device_updates.clone(),
        }
    }

    /// Push the current state onto the undo stack and drop redo history.
    pub fn capture(&mut self) {
        let snapshot = self.snapshot();
        self.history.capture(snapshot);
    }

    /// Step back one undoable mutation.
    ///
    /// `Ok(None)` when there is nothing to undo. A restore that would
    /// double-book a port is refused and leaves both stacks untouched.
    pub fn undo(&mut self) -> Result<Option<Restoration>, CoreError> {
        let Some(target) = self.history.peek_undo() else {
            return Ok(None);
        };
        let restored = self.prepare_restore(target)?;
        let current = self.snapshot();
        self.history.pop_undo_with_current(current);
        debug!(undo_depth = self.history.undo_depth(), "undo applied");
        Ok(Some(self.install(restored)))
    }

    /// Re-apply the most recently undone mutation.
    pub fn redo(&mut self) -> Result<Option<Restoration>, CoreError> {
        let Some(target) = self.history.peek_redo() else {
            return Ok(None);
        };
        let restored = self.prepare_restore(target)?;
        let current = self.snapshot();
        self.history.pop_redo_with_current(current);
        debug!(redo_depth = self.history.redo_depth(), "redo applied");
        Ok(Some(self.install(restored)))
    }

    fn prepare_restore(&self, snapshot: &Snapshot) -> Result<Restored, CoreError> {
        let mut overlay = IndexMap::new();
        for (id, base) in &self.persisted {
            match (snapshot.overlay.get(id), snapshot.persisted.get(id)) {
                (Some(entry), _) => {
                    overlay.insert(id.clone(), entry.clone());
                }
                (None, Some(captured)) => {
                    if !captured.same_shape(base) {
                        overlay.insert(
                            id.clone(),
                            OverlayEntry {
                                cable: captured.clone(),
                                edited: true,
                            },
                        );
                    }
                }
                // Persisted after the snapshot was taken: keep as is.
                (None, None) => {
                    if let Some(live) = self.overlay.get(id) {
                        overlay.insert(id.clone(), live.clone());
                    }
                }
            }
        }

        let mut devices = self.devices.clone();
        let mut moved_devices = Vec::new();
        for (id, device) in &mut devices {
            if let Some(position) = snapshot.device_position(id) {
                if position != device.position {
                    device.position = position;
                    moved_devices.push(id.clone());
                }
            }
        }

        let mut pending_device_updates: IndexSet<EntityId> = snapshot
            .pending_device_updates
            .iter()
            .filter(|id| devices.contains_key(*id))
            .cloned()
            .collect();
        pending_device_updates.extend(moved_devices.iter().cloned());

        let allocator = allocate(&self.drafts, &self.persisted, &overlay)?;

        Ok(Restored {
            overlay,
            devices,
            pending_device_updates,
            allocator,
            moved_devices,
        })
    }

    fn install(&mut self, restored: Restored) -> Restoration {
        self.overlay = restored.overlay;
        self.devices = restored.devices;
        self.pending_device_updates = restored.pending_device_updates;
        self.allocator = restored.allocator;
        self.pending_selection = None;
        Restoration {
            moved_devices: restored.moved_devices,
        }
    }
}
