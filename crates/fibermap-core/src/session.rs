// ── Editing session ──
//
// Public handle over one live editing session. Mutations run to
// completion under a synchronous lock that is never held across an
// `.await`; every successful mutation bumps a change counter that the
// background worker debounces into reconciliation passes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::event::{SessionEvent, SyncStatus};
use crate::gateway::PersistenceGateway;
use crate::model::{Cable, CableEnd, CableMeta, CableRef, Device, DraftId, EntityId, Point, Port};
use crate::reconcile::{WorkerCommand, worker_task};
use crate::store::{EndpointOutcome, PendingSelection, Restoration, SessionStore};

const EVENT_CHANNEL_SIZE: usize = 256;

/// The main entry point for editing a fiber topology.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Call [`close`](Self::close)
/// when done; it stops the background worker.
pub struct Session<G: PersistenceGateway> {
    inner: Arc<SessionInner<G>>,
}

impl<G: PersistenceGateway> Clone for Session<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct SessionInner<G> {
    pub(crate) gateway: G,
    pub(crate) config: SessionConfig,
    pub(crate) cancel: CancellationToken,
    store: Mutex<SessionStore>,
    changes: watch::Sender<u64>,
    status: watch::Sender<SyncStatus>,
    events: broadcast::Sender<SessionEvent>,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<G> SessionInner<G> {
    pub(crate) fn lock_store(&self) -> MutexGuard<'_, SessionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Hand queued remote deletions to the worker.
    pub(crate) fn forward_deletions(&self) {
        let deletions = self.lock_store().take_deletions();
        for deletion in deletions {
            debug!(id = %deletion.id(), "queueing remote deletion");
            let _ = self.commands.send(WorkerCommand::Delete(deletion));
        }
    }

    fn notify_change(&self) {
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }
}

impl<G: PersistenceGateway> Session<G> {
    /// Load the topology from `gateway` and start the reconciliation
    /// worker.
    pub async fn open(gateway: G, config: SessionConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let (devices, cables) = tokio::try_join!(gateway.list_devices(), gateway.list_cables())?;
        let mut store = SessionStore::new(config.clone());
        store.apply_refresh(devices, cables)?;
        info!(
            devices = store.devices().count(),
            cables = store.persisted_count(),
            "session opened"
        );

        let (changes_tx, changes_rx) = watch::channel(0);
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(SessionInner {
            gateway,
            config,
            cancel: CancellationToken::new(),
            store: Mutex::new(store),
            changes: changes_tx,
            status: status_tx,
            events: events_tx,
            commands: commands_tx,
            task_handles: tokio::sync::Mutex::new(Vec::new()),
        });

        let handle = tokio::spawn(worker_task(Arc::clone(&inner), changes_rx, commands_rx));
        inner.task_handles.lock().await.push(handle);

        Ok(Self { inner })
    }

    /// Stop the worker. A pending debounce is dropped; a pass already in
    /// flight completes first.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn status(&self) -> SyncStatus {
        self.inner.status()
    }

    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Counter bumped after every successful mutation.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Run `f` against the current state.
    pub fn read<T>(&self, f: impl FnOnce(&SessionStore) -> T) -> T {
        f(&self.inner.lock_store())
    }

    pub fn devices(&self) -> Vec<Device> {
        self.read(|s| s.devices().cloned().collect())
    }

    pub fn device(&self, id: &EntityId) -> Option<Device> {
        self.read(|s| s.device(id).cloned())
    }

    pub fn find_device(&self, identifier: &str) -> Result<Device, CoreError> {
        self.read(|s| s.find_device(identifier).cloned())
    }

    pub fn ports(&self, device_id: &EntityId) -> Result<Vec<Port>, CoreError> {
        self.read(|s| s.ports(device_id))
    }

    pub fn available_ports(&self, device_id: &EntityId) -> Result<Vec<Port>, CoreError> {
        self.read(|s| s.available_ports(device_id))
    }

    /// Persisted cables (with local edits applied), then drafts.
    pub fn cables(&self) -> Vec<Cable> {
        self.read(|s| s.cables().cloned().collect())
    }

    pub fn cable(&self, cable: &CableRef) -> Option<Cable> {
        self.read(|s| s.cable(cable).cloned())
    }

    pub fn pending_selection(&self) -> Option<PendingSelection> {
        self.read(|s| s.pending_selection().cloned())
    }

    pub fn is_dirty(&self) -> bool {
        self.read(SessionStore::is_dirty)
    }

    pub fn can_undo(&self) -> bool {
        self.read(SessionStore::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.read(SessionStore::can_redo)
    }

    /// Time of the last successful refresh (at open or after a pass).
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.read(SessionStore::refreshed_at)
    }

    // ── Editing ──────────────────────────────────────────────────────

    /// Apply one mutation and schedule reconciliation if it succeeded.
    pub fn edit<T>(
        &self,
        f: impl FnOnce(&mut SessionStore) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.ensure_open()?;
        let output = f(&mut self.inner.lock_store())?;
        self.inner.forward_deletions();
        self.inner.notify_change();
        Ok(output)
    }

    pub fn create_draft_cable(&self, anchor: Point, meta: CableMeta) -> Result<DraftId, CoreError> {
        self.edit(|s| s.create_draft_cable(anchor, meta))
    }

    pub fn move_endpoint(
        &self,
        cable: &CableRef,
        end: CableEnd,
        new_pos: Point,
    ) -> Result<EndpointOutcome, CoreError> {
        self.edit(|s| s.move_endpoint(cable, end, new_pos))
    }

    pub fn assign_port(
        &self,
        cable: &CableRef,
        end: CableEnd,
        port_id: &EntityId,
    ) -> Result<(), CoreError> {
        self.edit(|s| s.assign_port(cable, end, port_id))
    }

    pub fn cancel_pending_port_selection(&self, cable: &CableRef) -> Result<(), CoreError> {
        self.edit(|s| s.cancel_pending_port_selection(cable))
    }

    pub fn insert_waypoint(&self, cable: &CableRef, click: Point) -> Result<usize, CoreError> {
        self.edit(|s| s.insert_waypoint(cable, click))
    }

    pub fn remove_waypoint(&self, cable: &CableRef, index: usize) -> Result<Point, CoreError> {
        self.edit(|s| s.remove_waypoint(cable, index))
    }

    pub fn move_waypoint(
        &self,
        cable: &CableRef,
        index: usize,
        new_pos: Point,
    ) -> Result<(), CoreError> {
        self.edit(|s| s.move_waypoint(cable, index, new_pos))
    }

    pub fn set_waypoints(&self, cable: &CableRef, waypoints: Vec<Point>) -> Result<(), CoreError> {
        self.edit(|s| s.set_waypoints(cable, waypoints))
    }

    pub fn delete_cable(&self, cable: &CableRef) -> Result<(), CoreError> {
        self.edit(|s| s.delete_cable(cable))
    }

    /// Move a device; returns the cables dragged along.
    pub fn move_device(
        &self,
        device_id: &EntityId,
        new_pos: Point,
    ) -> Result<Vec<CableRef>, CoreError> {
        let dragged = self.edit(|s| s.move_device(device_id, new_pos))?;
        self.inner.emit(SessionEvent::DevicePositionChanged {
            device_id: device_id.clone(),
            position: new_pos,
        });
        Ok(dragged)
    }

    pub fn delete_device(&self, device_id: &EntityId) -> Result<(), CoreError> {
        self.edit(|s| s.delete_device(device_id))
    }

    // ── History ──────────────────────────────────────────────────────

    /// Step back one snapshot. `Ok(false)` when there is nothing to undo.
    pub fn undo(&self) -> Result<bool, CoreError> {
        self.restore(SessionStore::undo)
    }

    /// Step forward one snapshot. `Ok(false)` when there is nothing to
    /// redo.
    pub fn redo(&self) -> Result<bool, CoreError> {
        self.restore(SessionStore::redo)
    }

    fn restore(
        &self,
        step: fn(&mut SessionStore) -> Result<Option<Restoration>, CoreError>,
    ) -> Result<bool, CoreError> {
        self.ensure_open()?;
        let moved: Vec<(EntityId, Point)> = {
            let mut store = self.inner.lock_store();
            let Some(restoration) = step(&mut store)? else {
                return Ok(false);
            };
            restoration
                .moved_devices
                .into_iter()
                .filter_map(|id| {
                    let position = store.device(&id)?.position;
                    Some((id, position))
                })
                .collect()
        };

        self.inner.notify_change();
        for (device_id, position) in moved {
            self.inner.emit(SessionEvent::DevicePositionChanged {
                device_id,
                position,
            });
        }
        Ok(true)
    }

    // ── Reconciliation control ───────────────────────────────────────

    /// Run a pass now, skipping the debounce, and refresh even when
    /// nothing is pending.
    pub fn retry(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.inner
            .commands
            .send(WorkerCommand::Retry)
            .map_err(|_| CoreError::SessionClosed)
    }

    /// Push everything pending now and wait for the outcome, including
    /// any remote deletions queued before the call.
    pub async fn flush(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        let (tx, rx) = oneshot::channel();
        self.inner
            .commands
            .send(WorkerCommand::Flush(tx))
            .map_err(|_| CoreError::SessionClosed)?;
        rx.await.map_err(|_| CoreError::SessionClosed)?
    }

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.is_closed() {
            Err(CoreError::SessionClosed)
        } else {
            Ok(())
        }
    }
}
