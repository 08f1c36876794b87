// ── Debounce worker ──
//
// One background task per session. It owns the debounce timer, runs every
// pass and every remote deletion, so no two remote writes from the same
// session overlap.

use std::pin::pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::event::{SessionEvent, SyncStatus};
use crate::gateway::PersistenceGateway;
use crate::session::SessionInner;
use crate::store::Deletion;

use super::run_pass;

/// Requests from the session handle to its worker.
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    /// Send a queued deletion now.
    Delete(Deletion),
    /// Run a pass immediately, refreshing even when nothing is dirty.
    Retry,
    /// Run any pending pass immediately and report the outcome.
    Flush(oneshot::Sender<Result<(), CoreError>>),
}

pub(crate) async fn worker_task<G: PersistenceGateway>(
    inner: Arc<SessionInner<G>>,
    mut changes: watch::Receiver<u64>,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
) {
    let cancel = inner.cancel.clone();
    let debounce = inner.config.debounce;
    let mut timer = pin!(tokio::time::sleep(debounce));
    let mut armed = false;
    // Deletions refused since the last flush.
    let mut refused: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(command) = commands.recv() => match command {
                WorkerCommand::Delete(deletion) => {
                    if let Err(message) = process_deletion(&inner, deletion).await {
                        refused.push(message);
                    }
                }
                WorkerCommand::Retry => {
                    armed = false;
                    // The pass covers every change made so far.
                    changes.borrow_and_update();
                    run_pass(&inner, true).await;
                }
                WorkerCommand::Flush(reply) => {
                    armed = false;
                    changes.borrow_and_update();
                    run_pass(&inner, false).await;
                    let outcome = match inner.status() {
                        SyncStatus::Failed { message } => Err(CoreError::RemoteOperationFailure {
                            operation: "reconcile".into(),
                            message,
                            status: None,
                        }),
                        _ if !refused.is_empty() => Err(CoreError::RemoteOperationFailure {
                            operation: "delete".into(),
                            message: refused.join("; "),
                            status: None,
                        }),
                        _ => Ok(()),
                    };
                    refused.clear();
                    let _ = reply.send(outcome);
                }
            },
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                if inner.lock_store().is_dirty() {
                    timer.as_mut().reset(Instant::now() + debounce);
                    armed = true;
                    inner.set_status(SyncStatus::Scheduled);
                }
            }
            () = &mut timer, if armed => {
                armed = false;
                changes.borrow_and_update();
                run_pass(&inner, false).await;
            }
        }
    }

    debug!(armed, "reconciliation worker stopped");
}

/// Send one deletion. A 404 means the entity is already gone.
async fn process_deletion<G: PersistenceGateway>(
    inner: &SessionInner<G>,
    deletion: Deletion,
) -> Result<(), String> {
    let result = match &deletion {
        Deletion::Cable { id } => inner.gateway.delete_cable(id).await,
        Deletion::Device { id, device_type } => {
            inner.gateway.delete_device(device_type, id).await
        }
    };

    match result {
        Ok(()) => {
            debug!(id = %deletion.id(), "remote deletion done");
            Ok(())
        }
        Err(CoreError::RemoteOperationFailure {
            status: Some(404), ..
        }) => {
            debug!(id = %deletion.id(), "entity already absent remotely");
            Ok(())
        }
        Err(e) => {
            warn!(id = %deletion.id(), error = %e, "remote deletion failed");
            inner.lock_store().deletion_failed(&deletion);
            let message = e.to_string();
            inner.emit(SessionEvent::DeletionFailed {
                deletion,
                message: message.clone(),
            });
            Err(message)
        }
    }
}
