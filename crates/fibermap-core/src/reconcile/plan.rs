// ── Reconciliation plan ──
//
// What one pass sends, captured from the store under the lock. The plan
// owns clones, so the store stays editable while the pass is in flight;
// the commit later compares live state against what was sent.

use crate::model::{Cable, DeviceType, DraftId, EntityId, Point};

/// A device position to push.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceUpdate {
    pub id: EntityId,
    pub device_type: DeviceType,
    pub position: Point,
}

/// Writes one pass will issue, in step order.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// Step 1: pending device positions.
    pub device_updates: Vec<DeviceUpdate>,
    /// Step 2: drafts with both ports assigned.
    pub creations: Vec<Cable>,
    /// Step 3: edited overlay entries with both ports assigned.
    pub updates: Vec<Cable>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.device_updates.is_empty() && self.creations.is_empty() && self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.device_updates.len() + self.creations.len() + self.updates.len()
    }
}

/// What the inventory acknowledged for steps 2 and 3.
#[derive(Debug, Clone, Default)]
pub struct Acknowledged {
    /// Each created draft with the canonical record returned for it.
    pub created: Vec<(DraftId, Cable)>,
    /// Each updated cable with the record returned for it.
    pub updated: Vec<(EntityId, Cable)>,
}

/// Counts reported when a pass completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub devices: usize,
    pub created: usize,
    pub updated: usize,
}

impl From<&ReconcilePlan> for PassSummary {
    fn from(plan: &ReconcilePlan) -> Self {
        Self {
            devices: plan.device_updates.len(),
            created: plan.creations.len(),
            updated: plan.updates.len(),
        }
    }
}
