// ── Editing operations ──
//
// One method per operator gesture. Each validates against the current
// state first; only then does it capture undo history and apply itself.

use tracing::debug;

use super::{PendingSelection, PriorEntry, SessionStore};
use crate::error::CoreError;
use crate::geometry;
use crate::model::{Cable, CableEnd, CableMeta, CableRef, Device, DraftId, EntityId, Point, Port};

/// Where a dragged endpoint ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointOutcome {
    /// Snapped onto a device; a port must be picked from `available`
    /// (or the move cancelled).
    PendingPortSelection {
        device_id: EntityId,
        available: Vec<Port>,
    },
    /// Dropped on empty map; the end has no device or port.
    FreePoint,
}

fn require_finite(point: Point) -> Result<(), CoreError> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "coordinates must be finite, got ({}, {})",
            point.lat, point.lng
        )))
    }
}

/// Move every path point coincident with `old` to `new`.
fn drag_along(cable: &mut Cable, old: Point, new: Point, epsilon: f64) -> bool {
    let mut touched = false;
    for point in std::iter::once(&mut cable.from)
        .chain(cable.waypoints.iter_mut())
        .chain(std::iter::once(&mut cable.to))
    {
        if geometry::coincident(*point, old, epsilon) {
            *point = new;
            touched = true;
        }
    }
    touched
}

/// Clear every end of `cable` attached to `device_id`. Returns the ports
/// those ends held, or `None` when no end was attached.
fn detach_from(cable: &mut Cable, device_id: &EntityId) -> Option<Vec<EntityId>> {
    let mut attached = false;
    let mut released = Vec::new();
    for end in CableEnd::BOTH {
        let endpoint = cable.endpoint_mut(end);
        if endpoint.device_id.as_ref() == Some(device_id) {
            attached = true;
            released.extend(endpoint.port_id.take());
            endpoint.detach();
        }
    }
    attached.then_some(released)
}

impl SessionStore {
    /// Start a new draft at `anchor`. Both ends are unassigned.
    pub fn create_draft_cable(
        &mut self,
        anchor: Point,
        meta: CableMeta,
    ) -> Result<DraftId, CoreError> {
        if meta.cable_type.trim().is_empty() {
            return Err(CoreError::validation("cable type must not be blank"));
        }
        require_finite(anchor)?;

        let id = DraftId::new();
        let cable = Cable {
            id: CableRef::Draft(id),
            name: meta.name,
            cable_type: meta.cable_type,
            from: anchor,
            to: anchor.offset(self.config.draft_offset),
            waypoints: Vec::new(),
            start: crate::model::Endpoint::default(),
            end: crate::model::Endpoint::default(),
        };
        self.drafts.insert(id, cable);
        debug!(draft = %id, "draft cable created");
        Ok(id)
    }

    /// Drag one end of a cable to `new_pos`.
    ///
    /// Onto a device with a free port: the end snaps to the device and
    /// waits for [`assign_port`](Self::assign_port). Onto a full device,
    /// or while another cable still waits for its port: rejected, nothing
    /// changes. Elsewhere: the end becomes a free point.
    pub fn move_endpoint(
        &mut self,
        cable: &CableRef,
        end: CableEnd,
        new_pos: Point,
    ) -> Result<EndpointOutcome, CoreError> {
        require_finite(new_pos)?;
        let mut working = self.working_copy(cable)?;
        let own_port = working.endpoint(end).port_id.clone();

        let target =
            geometry::find_snap_target(new_pos, self.devices.values(), self.config.snap_epsilon)
                .cloned();
        if let Some(device) = &target {
            if let Some(pending) = self.pending_selection.as_ref().filter(|p| !p.is_for(cable)) {
                return Err(CoreError::validation(format!(
                    "cable {} is waiting for a port on device {}; assign or cancel it first",
                    pending.cable, pending.device_id
                )));
            }
            let keeps_own_port = own_port.as_ref().is_some_and(|p| device.port(p).is_some());
            if !keeps_own_port && !self.allocator.has_available_port(device) {
                return Err(self.full_device_error(device));
            }
        }

        let prior = self.prior_entry(cable);
        self.checkpoint(cable);
        if let Some(port) = &own_port {
            self.allocator.release(port);
        }

        let outcome = if let Some(device) = target {
            working.set_position(end, device.position);
            working.endpoint_mut(end).attach_device(device.id.clone());
            if let Some(prior) = prior {
                self.pending_selection = Some(PendingSelection {
                    cable: cable.clone(),
                    end,
                    device_id: device.id.clone(),
                    prior,
                });
            }
            debug!(%cable, %end, device = %device.id, "endpoint snapped, port selection pending");
            EndpointOutcome::PendingPortSelection {
                available: self.allocator.available_ports(&device),
                device_id: device.id,
            }
        } else {
            working.set_position(end, new_pos);
            working.endpoint_mut(end).detach();
            if self
                .pending_selection
                .as_ref()
                .is_some_and(|p| p.is_for(cable) && p.end == end)
            {
                self.pending_selection = None;
            }
            EndpointOutcome::FreePoint
        };

        self.write_back(working);
        Ok(outcome)
    }

    /// Give a device-attached end its port.
    pub fn assign_port(
        &mut self,
        cable: &CableRef,
        end: CableEnd,
        port_id: &EntityId,
    ) -> Result<(), CoreError> {
        let mut working = self.working_copy(cable)?;
        let endpoint = working.endpoint(end);
        let Some(device_id) = endpoint.device_id.clone() else {
            return Err(CoreError::validation(format!(
                "{end} end of cable {cable} is not attached to a device"
            )));
        };
        let port = self
            .require_device(&device_id)?
            .port(port_id)
            .cloned()
            .ok_or_else(|| CoreError::PortNotFound {
                port_id: port_id.clone(),
                device_id: device_id.clone(),
            })?;

        if endpoint.port_id.as_ref() == Some(port_id) {
            self.clear_selection_for(cable);
            return Ok(());
        }
        if let Some(claim) = self.allocator.holder(port_id) {
            return Err(CoreError::PortConflict {
                port_id: port_id.clone(),
                holder: claim.cable.clone(),
                end: claim.end,
            });
        }

        self.checkpoint(cable);
        if let Some(old) = working.endpoint(end).port_id.clone() {
            self.allocator.release(&old);
        }
        self.allocator.reserve(port_id, cable, end)?;

        let endpoint = working.endpoint_mut(end);
        endpoint.port_id = Some(port.id);
        endpoint.port_name = Some(port.name);

        self.clear_selection_for(cable);
        self.write_back(working);
        debug!(%cable, %end, port = %port_id, "port assigned");
        Ok(())
    }

    /// Undo the move that opened the pending port selection on `cable`,
    /// restoring the entry (and its port) as it was right before.
    pub fn cancel_pending_port_selection(&mut self, cable: &CableRef) -> Result<(), CoreError> {
        let Some(pending) = self.pending_selection.as_ref().filter(|p| p.is_for(cable)) else {
            return Err(CoreError::NoPendingSelection {
                cable: cable.clone(),
            });
        };

        let restored = match &pending.prior {
            PriorEntry::Draft(c) => c.clone(),
            PriorEntry::Overlay(Some(entry)) => entry.cable.clone(),
            PriorEntry::Overlay(None) => {
                let id = cable.as_persisted().ok_or_else(|| {
                    CoreError::Internal(format!("draft {cable} recorded an overlay prior"))
                })?;
                self.persisted
                    .get(id)
                    .cloned()
                    .ok_or_else(|| CoreError::CableNotFound {
                        cable: cable.clone(),
                    })?
            }
        };

        for (_, port_id) in restored.held_ports() {
            if let Some(claim) = self.allocator.holder(port_id) {
                if &claim.cable != cable {
                    return Err(CoreError::PortConflict {
                        port_id: port_id.clone(),
                        holder: claim.cable.clone(),
                        end: claim.end,
                    });
                }
            }
        }

        let Some(pending) = self.pending_selection.take() else {
            return Ok(());
        };
        self.allocator.release_cable(cable);
        for (end, port_id) in restored.held_ports() {
            self.allocator.reserve(port_id, cable, end)?;
        }

        match (pending.prior, cable) {
            (PriorEntry::Draft(c), CableRef::Draft(id)) => {
                self.drafts.insert(*id, c);
            }
            (PriorEntry::Overlay(Some(entry)), CableRef::Persisted(id)) => {
                self.overlay.insert(id.clone(), entry);
            }
            (PriorEntry::Overlay(None), CableRef::Persisted(id)) => {
                self.overlay.shift_remove(id);
            }
            _ => {
                return Err(CoreError::Internal(format!(
                    "pending selection for {cable} does not match its population"
                )));
            }
        }
        debug!(%cable, "pending port selection cancelled");
        Ok(())
    }

    /// Insert `click` as a waypoint on the nearest segment. Returns the
    /// waypoint index used.
    pub fn insert_waypoint(&mut self, cable: &CableRef, click: Point) -> Result<usize, CoreError> {
        require_finite(click)?;
        let mut working = self.working_copy(cable)?;
        let index = geometry::nearest_insertion_index(&working.path(), click);

        self.checkpoint(cable);
        working.waypoints.insert(index, click);
        self.write_back(working);
        Ok(index)
    }

    /// Remove the waypoint at `index`.
    pub fn remove_waypoint(&mut self, cable: &CableRef, index: usize) -> Result<Point, CoreError> {
        let mut working = self.working_copy(cable)?;
        if index >= working.waypoints.len() {
            return Err(CoreError::validation(format!(
                "waypoint index {index} out of range (cable {cable} has {})",
                working.waypoints.len()
            )));
        }

        self.checkpoint(cable);
        let removed = working.waypoints.remove(index);
        self.write_back(working);
        Ok(removed)
    }

    /// Drag the waypoint at `index` to `new_pos`.
    pub fn move_waypoint(
        &mut self,
        cable: &CableRef,
        index: usize,
        new_pos: Point,
    ) -> Result<(), CoreError> {
        require_finite(new_pos)?;
        let mut working = self.working_copy(cable)?;
        let Some(point) = working.waypoints.get_mut(index) else {
            return Err(CoreError::validation(format!(
                "waypoint index {index} out of range (cable {cable} has {})",
                working.waypoints.len()
            )));
        };
        *point = new_pos;

        self.checkpoint(cable);
        self.write_back(working);
        Ok(())
    }

    /// Replace all waypoints of a cable at once.
    pub fn set_waypoints(&mut self, cable: &CableRef, waypoints: Vec<Point>) -> Result<(), CoreError> {
        for point in &waypoints {
            require_finite(*point)?;
        }
        let mut working = self.working_copy(cable)?;

        self.checkpoint(cable);
        working.waypoints = waypoints;
        self.write_back(working);
        Ok(())
    }

    /// Delete a cable. Drafts vanish locally; persisted cables are hidden
    /// and their remote deletion is queued.
    pub fn delete_cable(&mut self, cable: &CableRef) -> Result<(), CoreError> {
        match cable {
            CableRef::Draft(id) => {
                if self.drafts.shift_remove(id).is_none() {
                    return Err(CoreError::CableNotFound {
                        cable: cable.clone(),
                    });
                }
            }
            CableRef::Persisted(id) => {
                if self.persisted.shift_remove(id).is_none() {
                    return Err(CoreError::CableNotFound {
                        cable: cable.clone(),
                    });
                }
                self.overlay.shift_remove(id);
                self.deleted_cables.insert(id.clone());
                self.outbox.push(super::Deletion::Cable { id: id.clone() });
            }
        }

        self.allocator.release_cable(cable);
        self.clear_selection_for(cable);
        debug!(%cable, "cable deleted");
        Ok(())
    }

    /// Move a device and drag along every cable point sitting on its old
    /// position. Returns the cables that moved with it.
    pub fn move_device(
        &mut self,
        device_id: &EntityId,
        new_pos: Point,
    ) -> Result<Vec<CableRef>, CoreError> {
        require_finite(new_pos)?;
        let device = self.require_device(device_id)?;
        if device.device_type.resource_path().is_none() {
            return Err(CoreError::validation(format!(
                "device type '{}' cannot be updated remotely",
                device.device_type
            )));
        }
        let old = device.position;
        if old == new_pos {
            return Ok(Vec::new());
        }

        self.capture();
        if let Some(device) = self.devices.get_mut(device_id) {
            device.position = new_pos;
        }

        let epsilon = self.config.snap_epsilon;
        let mut moved = Vec::new();

        let persisted_ids: Vec<EntityId> = self.persisted.keys().cloned().collect();
        for id in persisted_ids {
            let cable_ref = CableRef::Persisted(id);
            let Some(mut working) = self.cable(&cable_ref).cloned() else {
                continue;
            };
            if drag_along(&mut working, old, new_pos, epsilon) {
                self.write_back(working);
                moved.push(cable_ref);
            }
        }
        for draft in self.drafts.values_mut() {
            if drag_along(draft, old, new_pos, epsilon) {
                moved.push(draft.id.clone());
            }
        }

        self.pending_device_updates.insert(device_id.clone());
        debug!(device = %device_id, cables = moved.len(), "device moved");
        Ok(moved)
    }

    /// Delete a device. Its remote deletion is queued and every cable end
    /// attached to it is released.
    pub fn delete_device(&mut self, device_id: &EntityId) -> Result<(), CoreError> {
        let device = self.require_device(device_id)?;
        if device.device_type.resource_path().is_none() {
            return Err(CoreError::validation(format!(
                "device type '{}' cannot be deleted remotely",
                device.device_type
            )));
        }
        let device_type = device.device_type.clone();

        self.devices.shift_remove(device_id);
        self.pending_device_updates.shift_remove(device_id);
        self.deleted_devices.insert(device_id.clone());
        self.outbox.push(super::Deletion::Device {
            id: device_id.clone(),
            device_type,
        });

        let persisted_ids: Vec<EntityId> = self.persisted.keys().cloned().collect();
        for id in persisted_ids {
            let cable_ref = CableRef::Persisted(id);
            let Some(mut working) = self.cable(&cable_ref).cloned() else {
                continue;
            };
            if let Some(released) = detach_from(&mut working, device_id) {
                for port in &released {
                    self.allocator.release(port);
                }
                self.write_back(working);
            }
        }
        for draft in self.drafts.values_mut() {
            for port in detach_from(draft, device_id).unwrap_or_default() {
                self.allocator.release(&port);
            }
        }

        if self
            .pending_selection
            .as_ref()
            .is_some_and(|p| &p.device_id == device_id)
        {
            self.pending_selection = None;
        }
        debug!(device = %device_id, "device deleted");
        Ok(())
    }

    fn full_device_error(&self, device: &Device) -> CoreError {
        device
            .ports
            .iter()
            .find_map(|p| {
                self.allocator.holder(&p.id).map(|claim| CoreError::PortConflict {
                    port_id: p.id.clone(),
                    holder: claim.cable.clone(),
                    end: claim.end,
                })
            })
            .unwrap_or_else(|| {
                CoreError::validation(format!("device {} has no ports", device.label()))
            })
    }
}
