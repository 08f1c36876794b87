// ── Port allocation ──
//
// Tracks which cable end holds which port. Occupancy is always derivable
// from the cable populations; the allocator keeps it indexed so that
// reservations can be checked in O(1) and rebuilt wholesale after a
// refresh or an undo.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::model::{Cable, CableEnd, CableRef, Device, EntityId, Port};

/// The cable end holding a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortClaim {
    pub cable: CableRef,
    pub end: CableEnd,
}

/// Port occupancy index. At most one claim per port id.
#[derive(Debug, Clone, Default)]
pub struct PortAllocator {
    claims: HashMap<EntityId, PortClaim>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every port held by `cables`.
    ///
    /// Fails with [`CoreError::PortConflict`] on the first port claimed by
    /// two different cable ends.
    pub fn rebuild<'a, I>(cables: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = &'a Cable>,
    {
        let mut allocator = Self::new();
        for cable in cables {
            for (end, port_id) in cable.held_ports() {
                allocator.reserve(port_id, &cable.id, end)?;
            }
        }
        Ok(allocator)
    }

    /// Current holder of a port, if any.
    pub fn holder(&self, port_id: &EntityId) -> Option<&PortClaim> {
        self.claims.get(port_id)
    }

    pub fn is_occupied(&self, port_id: &EntityId) -> bool {
        self.claims.contains_key(port_id)
    }

    /// Claim `port_id` for one end of `cable`.
    ///
    /// Idempotent for the same `(cable, end)`; any other holder is a
    /// [`CoreError::PortConflict`] and leaves the index untouched.
    pub fn reserve(
        &mut self,
        port_id: &EntityId,
        cable: &CableRef,
        end: CableEnd,
    ) -> Result<(), CoreError> {
        if let Some(claim) = self.claims.get(port_id) {
            if &claim.cable == cable && claim.end == end {
                return Ok(());
            }
            return Err(CoreError::PortConflict {
                port_id: port_id.clone(),
                holder: claim.cable.clone(),
                end: claim.end,
            });
        }

        self.claims.insert(
            port_id.clone(),
            PortClaim {
                cable: cable.clone(),
                end,
            },
        );
        Ok(())
    }

    /// Free a port. Returns the claim that held it.
    pub fn release(&mut self, port_id: &EntityId) -> Option<PortClaim> {
        self.claims.remove(port_id)
    }

    /// Free every port held by `cable`.
    pub fn release_cable(&mut self, cable: &CableRef) {
        self.claims.retain(|_, claim| &claim.cable != cable);
    }

    /// Move all claims of `from` over to `to` (draft acknowledged by the
    /// inventory under its canonical id).
    pub fn rename_cable(&mut self, from: &CableRef, to: &CableRef) {
        for claim in self.claims.values_mut() {
            if &claim.cable == from {
                claim.cable = to.clone();
            }
        }
    }

    /// The device's ports, each flagged with its current occupancy.
    pub fn ports(&self, device: &Device) -> Vec<Port> {
        device
            .ports
            .iter()
            .map(|p| Port {
                occupied: self.is_occupied(&p.id),
                ..p.clone()
            })
            .collect()
    }

    /// The device's ports no cable end holds.
    pub fn available_ports(&self, device: &Device) -> Vec<Port> {
        self.ports(device)
            .into_iter()
            .filter(|p| !p.occupied)
            .collect()
    }

    pub fn has_available_port(&self, device: &Device) -> bool {
        device.ports.iter().any(|p| !self.is_occupied(&p.id))
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
