// ── Reconciliation bookkeeping ──
//
// The store side of a pass: building the plan, committing what the
// inventory acknowledged, and merging a refreshed canonical view while
// keeping every local edit that was not part of the pass.

use std::collections::HashSet;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{Deletion, OverlayEntry, SessionStore, allocate};
use crate::error::CoreError;
use crate::model::{Cable, CableRef, Device, EntityId};
use crate::reconcile::plan::{Acknowledged, DeviceUpdate, ReconcilePlan};

fn inconsistency(err: &CoreError) -> CoreError {
    CoreError::RemoteInconsistency {
        message: format!("refreshed topology cannot be applied: {err}"),
    }
}

impl SessionStore {
    /// Everything eligible for the next pass.
    pub fn plan(&self) -> ReconcilePlan {
        let device_updates = self
            .pending_device_updates
            .iter()
            .filter_map(|id| self.devices.get(id))
            .map(|d| DeviceUpdate {
                id: d.id.clone(),
                device_type: d.device_type.clone(),
                position: d.position,
            })
            .collect();

        let creations = self
            .drafts
            .values()
            .filter(|c| c.has_both_ports())
            .cloned()
            .collect();

        let updates = self
            .overlay
            .values()
            .filter(|e| e.edited && e.cable.has_both_ports())
            .map(|e| e.cable.clone())
            .collect();

        ReconcilePlan {
            device_updates,
            creations,
            updates,
        }
    }

    /// Fold the acknowledged writes of a pass into local state.
    ///
    /// Only what was sent is cleared: a draft or overlay entry edited
    /// while the pass was in flight stays pending, and so does a device
    /// moved again.
    ///
    /// Committing never moves a port claim. Acknowledged drafts take
    /// their canonical ids and keep their ports. A returned record whose
    /// ports differ from the local cable becomes the canonical base, the
    /// local cable stays on top of it without the edited mark, and the
    /// mismatch is returned as [`CoreError::RemoteInconsistency`] after
    /// everything else has been committed.
    pub fn commit_sent(
        &mut self,
        plan: &ReconcilePlan,
        ack: &Acknowledged,
    ) -> Result<(), CoreError> {
        let mut rejected = Vec::new();

        for (draft_id, record) in &ack.created {
            let CableRef::Persisted(new_id) = &record.id else {
                rejected.push(format!("created cable for {draft_id} has no canonical id"));
                continue;
            };
            let draft_ref = CableRef::Draft(*draft_id);
            let Some(mut local) = self.drafts.shift_remove(draft_id) else {
                // Deleted locally while its creation was in flight.
                debug!(cable = %new_id, "created cable was deleted meanwhile; queueing removal");
                self.deleted_cables.insert(new_id.clone());
                self.outbox.push(Deletion::Cable { id: new_id.clone() });
                continue;
            };

            let edited = !plan
                .creations
                .iter()
                .find(|c| c.id == draft_ref)
                .is_some_and(|sent| sent.same_shape(&local));
            self.allocator.rename_cable(&draft_ref, &record.id);
            local.id = record.id.clone();

            let ports_kept = local.same_ports(record);
            if !ports_kept {
                rejected.push(format!("inventory created cable {new_id} on other ports"));
            }
            if edited || !ports_kept {
                self.overlay
                    .insert(new_id.clone(), OverlayEntry { cable: local, edited });
            }
            self.persisted.insert(new_id.clone(), record.clone());
        }

        for (id, record) in &ack.updated {
            if self.deleted_cables.contains(id) {
                continue;
            }
            let mut record = record.clone();
            record.id = CableRef::Persisted(id.clone());

            match self.overlay.get(id) {
                Some(entry) => {
                    let settled = plan
                        .updates
                        .iter()
                        .find(|c| c.id.as_persisted() == Some(id))
                        .is_some_and(|sent| sent.same_shape(&entry.cable));
                    if !entry.cable.same_ports(&record) {
                        rejected.push(format!("inventory kept the previous ports of cable {id}"));
                        if let Some(entry) = self.overlay.get_mut(id).filter(|_| settled) {
                            entry.edited = false;
                        }
                    } else if settled {
                        self.overlay.shift_remove(id);
                    }
                }
                None => {
                    // Undone while in flight: the local base keeps its ports.
                    if let Some(base) = self.persisted.get(id).filter(|b| !b.same_ports(&record)) {
                        rejected.push(format!("inventory reports other ports for cable {id}"));
                        let cable = base.clone();
                        self.overlay
                            .insert(id.clone(), OverlayEntry { cable, edited: false });
                    }
                }
            }
            self.persisted.insert(id.clone(), record);
        }

        for update in &plan.device_updates {
            let unchanged = self
                .devices
                .get(&update.id)
                .is_some_and(|d| d.position == update.position);
            if unchanged {
                self.pending_device_updates.shift_remove(&update.id);
            }
        }

        if self
            .pending_selection
            .as_ref()
            .is_some_and(|p| matches!(&p.cable, CableRef::Draft(id) if !self.drafts.contains_key(id)))
        {
            self.pending_selection = None;
        }

        if rejected.is_empty() {
            Ok(())
        } else {
            warn!(count = rejected.len(), "acknowledged records disagree with local ports");
            Err(CoreError::RemoteInconsistency {
                message: rejected.join("; "),
            })
        }
    }

    /// Replace canonical devices and cables with a refreshed view.
    ///
    /// Locally deleted entities stay hidden, pending device positions
    /// win over the refreshed ones, and overlay entries survive unless
    /// they are clean copies of the new canonical record. Incomplete
    /// overlay entries are kept but no longer marked edited.
    pub fn apply_refresh(
        &mut self,
        devices: Vec<Device>,
        cables: Vec<Cable>,
    ) -> Result<(), CoreError> {
        let reported_devices: HashSet<EntityId> = devices.iter().map(|d| d.id.clone()).collect();
        let reported_cables: HashSet<EntityId> = cables
            .iter()
            .filter_map(|c| c.id.as_persisted().cloned())
            .collect();

        let mut refreshed_devices = IndexMap::with_capacity(devices.len());
        for mut device in devices {
            if self.deleted_devices.contains(&device.id) {
                continue;
            }
            if self.pending_device_updates.contains(&device.id) {
                if let Some(local) = self.devices.get(&device.id) {
                    device.position = local.position;
                }
            }
            refreshed_devices.insert(device.id.clone(), device);
        }

        let mut persisted = IndexMap::with_capacity(cables.len());
        for cable in cables {
            let Some(id) = cable.id.as_persisted().cloned() else {
                warn!(cable = %cable.id, "refresh returned a cable without canonical id; skipping");
                continue;
            };
            if self.deleted_cables.contains(&id) {
                continue;
            }
            persisted.insert(id, cable);
        }

        let mut overlay = IndexMap::new();
        for (id, entry) in &self.overlay {
            let Some(base) = persisted.get(id) else {
                debug!(cable = %id, "dropping overlay entry for a cable no longer reported");
                continue;
            };
            if !entry.edited && entry.cable.same_shape(base) {
                continue;
            }
            let mut entry = entry.clone();
            if !entry.cable.has_both_ports() {
                entry.edited = false;
            }
            overlay.insert(id.clone(), entry);
        }

        let allocator =
            allocate(&self.drafts, &persisted, &overlay).map_err(|e| inconsistency(&e))?;

        self.pending_device_updates
            .retain(|id| refreshed_devices.contains_key(id));
        self.devices = refreshed_devices;
        self.persisted = persisted;
        self.overlay = overlay;
        self.allocator = allocator;

        self.deleted_devices.retain(|id| reported_devices.contains(id));
        self.deleted_cables.retain(|id| reported_cables.contains(id));

        let stale_selection = self
            .pending_selection
            .as_ref()
            .is_some_and(|p| self.cable(&p.cable).is_none() || !self.devices.contains_key(&p.device_id));
        if stale_selection {
            self.pending_selection = None;
        }
        self.refreshed_at = Some(Utc::now());

        debug!(
            devices = self.devices.len(),
            cables = self.persisted.len(),
            overlay = self.overlay.len(),
            drafts = self.drafts.len(),
            "refreshed topology applied"
        );
        Ok(())
    }

    /// A queued remote deletion failed: stop hiding the entity so the
    /// next refresh brings it back.
    pub fn deletion_failed(&mut self, deletion: &Deletion) {
        match deletion {
            Deletion::Cable { id } => {
                self.deleted_cables.remove(id);
            }
            Deletion::Device { id, .. } => {
                self.deleted_devices.remove(id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{CableEnd, CableMeta, DraftId, Point};
    use crate::store::test_support::{
        cable_100, device, endpoint, loaded_store, persisted_cable,
    };

    fn draft_between(store: &mut SessionStore, start_port: u64, end_port: u64) -> DraftId {
        let id = store
            .create_draft_cable(
                Point::new(0.0, 0.0),
                CableMeta {
                    name: "FO-new".into(),
                    cable_type: "drop".into(),
                },
            )
            .unwrap();
        let draft = CableRef::Draft(id);
        store
            .move_endpoint(&draft, CableEnd::Start, Point::new(10.0, 20.0))
            .unwrap();
        store
            .assign_port(&draft, CableEnd::Start, &EntityId::Numeric(start_port))
            .unwrap();
        store
            .move_endpoint(&draft, CableEnd::End, Point::new(11.0, 21.0))
            .unwrap();
        store
            .assign_port(&draft, CableEnd::End, &EntityId::Numeric(end_port))
            .unwrap();
        id
    }

    fn complete_draft(store: &mut SessionStore) -> DraftId {
        draft_between(store, 11, 21)
    }

    /// Cable 100's far end moves from port 20 to port 21.
    fn reassign_far_end(store: &mut SessionStore) {
        store
            .move_endpoint(&cable_100(), CableEnd::End, Point::new(11.0, 21.0))
            .unwrap();
        store
            .assign_port(&cable_100(), CableEnd::End, &EntityId::Numeric(21))
            .unwrap();
    }

    fn server_copy(cable: &Cable, id: u64) -> Cable {
        Cable {
            id: CableRef::Persisted(EntityId::Numeric(id)),
            ..cable.clone()
        }
    }

    fn refreshed_devices() -> Vec<Device> {
        vec![
            device(1, 10.0, 20.0, &[10, 11]),
            device(2, 11.0, 21.0, &[20, 21]),
        ]
    }

    #[test]
    fn plan_excludes_incomplete_drafts() {
        let mut store = loaded_store();
        store
            .create_draft_cable(
                Point::new(0.0, 0.0),
                CableMeta {
                    name: "half".into(),
                    cable_type: "drop".into(),
                },
            )
            .unwrap();
        let complete = complete_draft(&mut store);

        let plan = store.plan();
        assert_eq!(plan.creations.len(), 1);
        assert_eq!(plan.creations[0].id, CableRef::Draft(complete));
        assert!(plan.updates.is_empty());
        assert!(plan.device_updates.is_empty());
    }

    #[test]
    fn commit_moves_draft_to_persisted() {
        let mut store = loaded_store();
        let id = complete_draft(&mut store);
        let plan = store.plan();
        let record = server_copy(&plan.creations[0], 555);

        store
            .commit_sent(
                &plan,
                &Acknowledged {
                    created: vec![(id, record)],
                    updated: Vec::new(),
                },
            )
            .unwrap();

        assert!(store.cable(&CableRef::Draft(id)).is_none());
        let persisted = CableRef::Persisted(EntityId::Numeric(555));
        assert!(store.cable(&persisted).is_some());
        assert_eq!(
            store.port_holder(&EntityId::Numeric(11)).unwrap().cable,
            persisted
        );
        assert!(!store.is_dirty());
    }

    #[test]
    fn edits_during_flight_survive_commit() {
        let mut store = loaded_store();
        let cable = cable_100();
        store.insert_waypoint(&cable, Point::new(10.5, 20.5)).unwrap();
        store
            .move_device(&EntityId::Numeric(2), Point::new(11.1, 21.1))
            .unwrap();
        let plan = store.plan();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.device_updates.len(), 1);

        // Edits made while the pass is in flight.
        store.move_waypoint(&cable, 0, Point::new(10.4, 20.4)).unwrap();
        store
            .move_device(&EntityId::Numeric(2), Point::new(11.2, 21.2))
            .unwrap();

        let sent = plan.updates[0].clone();
        store
            .commit_sent(
                &plan,
                &Acknowledged {
                    created: Vec::new(),
                    updated: vec![(EntityId::Numeric(100), sent)],
                },
            )
            .unwrap();

        let entry = store.overlay_entry(&EntityId::Numeric(100)).unwrap();
        assert!(entry.edited);
        assert_eq!(entry.cable.waypoints, vec![Point::new(10.4, 20.4)]);
        assert_eq!(store.pending_device_updates().count(), 1);
        assert!(store.is_dirty());
    }

    #[test]
    fn commit_clears_what_was_sent() {
        let mut store = loaded_store();
        store.insert_waypoint(&cable_100(), Point::new(10.5, 20.5)).unwrap();
        store
            .move_device(&EntityId::Numeric(2), Point::new(11.1, 21.1))
            .unwrap();
        let plan = store.plan();
        let sent = plan.updates[0].clone();

        store
            .commit_sent(
                &plan,
                &Acknowledged {
                    created: Vec::new(),
                    updated: vec![(EntityId::Numeric(100), sent.clone())],
                },
            )
            .unwrap();

        assert!(store.overlay_entry(&EntityId::Numeric(100)).is_none());
        assert_eq!(store.cable(&cable_100()).unwrap().waypoints, sent.waypoints);
        assert!(!store.is_dirty());
    }

    #[test]
    fn ports_the_inventory_kept_stay_local() {
        let mut store = loaded_store();
        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        reassign_far_end(&mut store);
        let plan = store.plan();
        assert_eq!(plan.updates.len(), 1);

        // The inventory stored the path but still reports port 20.
        let err = store.commit_sent(
            &plan,
            &Acknowledged {
                created: Vec::new(),
                updated: vec![(EntityId::Numeric(100), base.clone())],
            },
        );
        assert!(matches!(err, Err(CoreError::RemoteInconsistency { .. })));

        let cable = store.cable(&cable_100()).unwrap();
        assert_eq!(cable.end.port_id, Some(EntityId::Numeric(21)));
        assert_eq!(
            store.persisted(&EntityId::Numeric(100)).unwrap().end.port_id,
            Some(EntityId::Numeric(20))
        );
        assert!(!store.overlay_entry(&EntityId::Numeric(100)).unwrap().edited);
        assert_eq!(
            store.port_holder(&EntityId::Numeric(21)).unwrap().cable,
            cable_100()
        );
        assert!(store.port_holder(&EntityId::Numeric(20)).is_none());
        assert!(!store.is_dirty(), "not re-sent until touched again");

        store.apply_refresh(refreshed_devices(), vec![base]).unwrap();
        assert_eq!(
            store.cable(&cable_100()).unwrap().end.port_id,
            Some(EntityId::Numeric(21))
        );
    }

    #[test]
    fn creations_commit_even_when_an_update_disagrees() {
        let mut store = loaded_store();
        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        reassign_far_end(&mut store);
        let draft = draft_between(&mut store, 11, 20);
        let plan = store.plan();
        assert_eq!((plan.creations.len(), plan.updates.len()), (1, 1));
        let created = server_copy(&plan.creations[0], 555);

        let err = store.commit_sent(
            &plan,
            &Acknowledged {
                created: vec![(draft, created)],
                updated: vec![(EntityId::Numeric(100), base)],
            },
        );
        assert!(matches!(err, Err(CoreError::RemoteInconsistency { .. })));

        assert!(store.cable(&CableRef::Draft(draft)).is_none());
        let persisted = CableRef::Persisted(EntityId::Numeric(555));
        assert!(store.cable(&persisted).is_some());
        assert_eq!(
            store.port_holder(&EntityId::Numeric(20)).unwrap().cable,
            persisted
        );
        assert!(store.plan().is_empty(), "the creation is not sent again");
    }

    #[test]
    fn creation_on_other_ports_keeps_local_cable() {
        let mut store = loaded_store();
        let id = complete_draft(&mut store);
        let plan = store.plan();
        let mut record = server_copy(&plan.creations[0], 557);
        record.end = endpoint(2, 20);

        let err = store.commit_sent(
            &plan,
            &Acknowledged {
                created: vec![(id, record)],
                updated: Vec::new(),
            },
        );
        assert!(matches!(err, Err(CoreError::RemoteInconsistency { .. })));

        let persisted = CableRef::Persisted(EntityId::Numeric(557));
        assert_eq!(
            store.cable(&persisted).unwrap().end.port_id,
            Some(EntityId::Numeric(21))
        );
        assert_eq!(
            store.port_holder(&EntityId::Numeric(21)).unwrap().cable,
            persisted
        );
        assert!(store.drafts().next().is_none());
    }

    #[test]
    fn draft_deleted_in_flight_is_removed_remotely() {
        let mut store = loaded_store();
        let id = complete_draft(&mut store);
        let plan = store.plan();
        store.delete_cable(&CableRef::Draft(id)).unwrap();

        store
            .commit_sent(
                &plan,
                &Acknowledged {
                    created: vec![(id, server_copy(&plan.creations[0], 556))],
                    updated: Vec::new(),
                },
            )
            .unwrap();

        assert!(
            store
                .cable(&CableRef::Persisted(EntityId::Numeric(556)))
                .is_none()
        );
        assert_eq!(
            store.take_deletions(),
            vec![Deletion::Cable {
                id: EntityId::Numeric(556)
            }]
        );
    }

    #[test]
    fn refresh_keeps_incomplete_overlay_unedited() {
        let mut store = loaded_store();
        let cable = cable_100();
        store
            .move_endpoint(&cable, CableEnd::End, Point::new(50.0, 50.0))
            .unwrap();
        assert!(store.overlay_entry(&EntityId::Numeric(100)).unwrap().edited);

        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        store.apply_refresh(refreshed_devices(), vec![base]).unwrap();

        let entry = store.overlay_entry(&EntityId::Numeric(100)).unwrap();
        assert!(!entry.edited);
        assert_eq!(entry.cable.to, Point::new(50.0, 50.0));
    }

    #[test]
    fn refresh_hides_locally_deleted_cables() {
        let mut store = loaded_store();
        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        store.delete_cable(&cable_100()).unwrap();

        store
            .apply_refresh(refreshed_devices(), vec![base.clone()])
            .unwrap();
        assert!(store.cable(&cable_100()).is_none());
        assert!(store.is_deleted_cable(&EntityId::Numeric(100)));

        // Once the inventory stops reporting it the tombstone goes.
        store.apply_refresh(refreshed_devices(), Vec::new()).unwrap();
        assert!(!store.is_deleted_cable(&EntityId::Numeric(100)));
    }

    #[test]
    fn failed_deletion_lets_refresh_restore_the_cable() {
        let mut store = loaded_store();
        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        store.delete_cable(&cable_100()).unwrap();
        for deletion in store.take_deletions() {
            store.deletion_failed(&deletion);
        }

        store.apply_refresh(refreshed_devices(), vec![base]).unwrap();
        assert!(store.cable(&cable_100()).is_some());
    }

    #[test]
    fn refresh_keeps_pending_device_position() {
        let mut store = loaded_store();
        store
            .move_device(&EntityId::Numeric(1), Point::new(9.0, 9.0))
            .unwrap();

        let base = store.persisted(&EntityId::Numeric(100)).cloned().unwrap();
        store.apply_refresh(refreshed_devices(), vec![base]).unwrap();

        assert_eq!(
            store.device(&EntityId::Numeric(1)).unwrap().position,
            Point::new(9.0, 9.0)
        );
        assert!(store.is_dirty());
    }

    #[test]
    fn refresh_with_double_booked_port_is_inconsistent() {
        let mut store = loaded_store();
        let before = store.snapshot();
        let clash = vec![
            persisted_cable(
                100,
                Point::new(10.0, 20.0),
                Point::new(11.0, 21.0),
                endpoint(1, 10),
                endpoint(2, 20),
            ),
            persisted_cable(
                101,
                Point::new(10.0, 20.0),
                Point::new(11.0, 21.0),
                endpoint(1, 10),
                endpoint(2, 21),
            ),
        ];

        let err = store.apply_refresh(refreshed_devices(), clash);
        assert!(matches!(err, Err(CoreError::RemoteInconsistency { .. })));
        assert_eq!(store.snapshot(), before);
    }
}
