// ── Session store ──
//
// Owns the live topology of one editing session: devices, persisted
// cables with their modification overlay, and local drafts. Every
// operation validates before it touches state, so an error always leaves
// the store exactly as it was.

mod editing;
mod refresh;
mod snapshot;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::history::EditHistory;
use crate::model::{Cable, CableEnd, CableRef, Device, DeviceType, DraftId, EntityId, Port};
use crate::ports::{PortAllocator, PortClaim};

pub use editing::EndpointOutcome;
pub use snapshot::{Restoration, Snapshot};

// ── Supporting types ─────────────────────────────────────────────────

/// A pending local edit of a persisted cable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayEntry {
    /// The cable as edited locally.
    pub cable: Cable,
    /// Still to be pushed. Cleared once a pass sends it, and on refresh
    /// for entries whose ports are incomplete.
    pub edited: bool,
}

/// The cable entry as it was before the move that opened a port
/// selection.
#[derive(Debug, Clone)]
pub(crate) enum PriorEntry {
    Draft(Cable),
    Overlay(Option<OverlayEntry>),
}

/// An endpoint snapped onto a device and waiting for its port.
#[derive(Debug, Clone)]
pub struct PendingSelection {
    pub cable: CableRef,
    pub end: CableEnd,
    pub device_id: EntityId,
    pub(crate) prior: PriorEntry,
}

impl PendingSelection {
    fn is_for(&self, cable: &CableRef) -> bool {
        &self.cable == cable
    }
}

/// A remote deletion queued by `delete_cable` / `delete_device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    Cable { id: EntityId },
    Device { id: EntityId, device_type: DeviceType },
}

impl Deletion {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Cable { id } | Self::Device { id, .. } => id,
        }
    }
}

// ── SessionStore ─────────────────────────────────────────────────────

/// Live editing state of one session.
#[derive(Debug)]
pub struct SessionStore {
    config: SessionConfig,
    devices: IndexMap<EntityId, Device>,
    persisted: IndexMap<EntityId, Cable>,
    overlay: IndexMap<EntityId, OverlayEntry>,
    drafts: IndexMap<DraftId, Cable>,
    pending_device_updates: IndexSet<EntityId>,
    pending_selection: Option<PendingSelection>,
    allocator: PortAllocator,
    history: EditHistory<Snapshot>,
    /// Removed locally; kept out of refreshed data until the inventory
    /// stops reporting them.
    deleted_cables: HashSet<EntityId>,
    deleted_devices: HashSet<EntityId>,
    outbox: Vec<Deletion>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        let history = EditHistory::with_capacity(config.history_capacity);
        Self {
            config,
            devices: IndexMap::new(),
            persisted: IndexMap::new(),
            overlay: IndexMap::new(),
            drafts: IndexMap::new(),
            pending_device_updates: IndexSet::new(),
            pending_selection: None,
            allocator: PortAllocator::new(),
            history,
            deleted_cables: HashSet::new(),
            deleted_devices: HashSet::new(),
            outbox: Vec::new(),
            refreshed_at: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// When the canonical view was last applied.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn device(&self, id: &EntityId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Look a device up by id or, failing that, by exact name.
    pub fn find_device(&self, identifier: &str) -> Result<&Device, CoreError> {
        let id = EntityId::from(identifier);
        self.devices
            .get(&id)
            .or_else(|| {
                self.devices
                    .values()
                    .find(|d| d.name.as_deref() == Some(identifier))
            })
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: identifier.to_owned(),
            })
    }

    /// The device's ports flagged with current occupancy.
    pub fn ports(&self, device_id: &EntityId) -> Result<Vec<Port>, CoreError> {
        Ok(self.allocator.ports(self.require_device(device_id)?))
    }

    /// Ports of the device no cable end holds.
    pub fn available_ports(&self, device_id: &EntityId) -> Result<Vec<Port>, CoreError> {
        Ok(self
            .allocator
            .available_ports(self.require_device(device_id)?))
    }

    pub fn port_holder(&self, port_id: &EntityId) -> Option<&PortClaim> {
        self.allocator.holder(port_id)
    }

    // ── Cables ───────────────────────────────────────────────────────

    /// Effective cable: the overlay entry if present, else the persisted
    /// record or the draft.
    pub fn cable(&self, cable: &CableRef) -> Option<&Cable> {
        match cable {
            CableRef::Draft(id) => self.drafts.get(id),
            CableRef::Persisted(id) => self
                .overlay
                .get(id)
                .map(|e| &e.cable)
                .or_else(|| self.persisted.get(id)),
        }
    }

    /// Every cable as the operator sees it: persisted (overlay applied)
    /// followed by drafts.
    pub fn cables(&self) -> impl Iterator<Item = &Cable> {
        self.persisted
            .iter()
            .map(|(id, base)| self.overlay.get(id).map_or(base, |e| &e.cable))
            .chain(self.drafts.values())
    }

    pub fn drafts(&self) -> impl Iterator<Item = &Cable> {
        self.drafts.values()
    }

    /// Canonical record of a persisted cable, ignoring local edits.
    pub fn persisted(&self, id: &EntityId) -> Option<&Cable> {
        self.persisted.get(id)
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted.len()
    }

    pub fn overlay_entry(&self, id: &EntityId) -> Option<&OverlayEntry> {
        self.overlay.get(id)
    }

    // ── Session state ────────────────────────────────────────────────

    pub fn pending_device_updates(&self) -> impl Iterator<Item = &EntityId> {
        self.pending_device_updates.iter()
    }

    pub fn pending_selection(&self) -> Option<&PendingSelection> {
        self.pending_selection.as_ref()
    }

    /// Something is waiting to be pushed: a complete draft, an edited
    /// complete overlay entry, or a moved device.
    pub fn is_dirty(&self) -> bool {
        self.drafts.values().any(Cable::has_both_ports)
            || self
                .overlay
                .values()
                .any(|e| e.edited && e.cable.has_both_ports())
            || !self.pending_device_updates.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drain deletions queued since the last call.
    pub fn take_deletions(&mut self) -> Vec<Deletion> {
        std::mem::take(&mut self.outbox)
    }

    /// Whether a cable id was deleted locally and is still being hidden.
    pub fn is_deleted_cable(&self, id: &EntityId) -> bool {
        self.deleted_cables.contains(id)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    fn require_device(&self, id: &EntityId) -> Result<&Device, CoreError> {
        self.devices
            .get(id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: id.to_string(),
            })
    }

    /// Owned copy of the effective cable, to edit and write back.
    fn working_copy(&self, cable: &CableRef) -> Result<Cable, CoreError> {
        self.cable(cable)
            .cloned()
            .ok_or_else(|| CoreError::CableNotFound {
                cable: cable.clone(),
            })
    }

    /// The entry that `cancel_pending_port_selection` would restore.
    fn prior_entry(&self, cable: &CableRef) -> Option<PriorEntry> {
        match cable {
            CableRef::Draft(id) => self.drafts.get(id).cloned().map(PriorEntry::Draft),
            CableRef::Persisted(id) => Some(PriorEntry::Overlay(self.overlay.get(id).cloned())),
        }
    }

    /// Store an edited cable: drafts in place, persisted cables as an
    /// edited overlay entry.
    fn write_back(&mut self, cable: Cable) {
        match cable.id.clone() {
            CableRef::Draft(id) => {
                self.drafts.insert(id, cable);
            }
            CableRef::Persisted(id) => {
                self.overlay.insert(
                    id,
                    OverlayEntry {
                        cable,
                        edited: true,
                    },
                );
            }
        }
    }

    /// Capture undo history before editing `cable`. Drafts are outside
    /// snapshots, so draft edits are not recorded.
    fn checkpoint(&mut self, cable: &CableRef) {
        if !cable.is_draft() {
            self.capture();
        }
    }

    fn clear_selection_for(&mut self, cable: &CableRef) {
        if self
            .pending_selection
            .as_ref()
            .is_some_and(|p| p.is_for(cable))
        {
            self.pending_selection = None;
        }
    }
}

/// Port occupancy for a candidate state of the three cable populations.
fn allocate(
    drafts: &IndexMap<DraftId, Cable>,
    persisted: &IndexMap<EntityId, Cable>,
    overlay: &IndexMap<EntityId, OverlayEntry>,
) -> Result<PortAllocator, CoreError> {
    let effective = persisted
        .iter()
        .map(|(id, base)| overlay.get(id).map_or(base, |e| &e.cable));
    PortAllocator::rebuild(effective.chain(drafts.values()))
}
