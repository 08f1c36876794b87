// ── Reconciliation ──
//
// A pass pushes the plan in three ordered steps, each fanned out
// concurrently, then refreshes the canonical view. The refresh only runs
// when every write of steps 1–3 succeeded.

pub mod plan;
mod scheduler;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::event::{SessionEvent, SyncStatus};
use crate::gateway::PersistenceGateway;
use crate::model::CableRef;
use crate::session::SessionInner;

use self::plan::{Acknowledged, PassSummary, ReconcilePlan};

pub(crate) use scheduler::{WorkerCommand, worker_task};

/// Steps 1–3: push device positions, create drafts, update overlays.
///
/// Each step runs its writes concurrently and must fully succeed before
/// the next begins. Writes that succeeded before a failure are not
/// rolled back.
pub(crate) async fn push_plan<G: PersistenceGateway>(
    gateway: &G,
    plan: &ReconcilePlan,
) -> Result<Acknowledged, CoreError> {
    join_all(
        plan.device_updates
            .iter()
            .map(|u| gateway.update_device_position(&u.device_type, &u.id, u.position)),
    )
    .await
    .into_iter()
    .collect::<Result<Vec<()>, _>>()?;

    let created = join_all(plan.creations.iter().map(|cable| async move {
        let CableRef::Draft(draft_id) = cable.id else {
            return Err(CoreError::Internal(format!(
                "cable {} is not a draft",
                cable.id
            )));
        };
        let record = gateway.create_cable(cable).await?;
        Ok((draft_id, record))
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<_>, CoreError>>()?;

    let updated = join_all(plan.updates.iter().map(|cable| async move {
        let id = cable.id.as_persisted().ok_or_else(|| {
            CoreError::Internal(format!("cable {} has no canonical id", cable.id))
        })?;
        let record = gateway.update_cable_path(id, &cable.path()).await?;
        Ok((id.clone(), record))
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<_>, CoreError>>()?;

    Ok(Acknowledged { created, updated })
}

/// One full pass. `force` runs the refresh even with nothing to push.
pub(crate) async fn run_pass<G: PersistenceGateway>(inner: &SessionInner<G>, force: bool) {
    let plan = inner.lock_store().plan();
    if plan.is_empty() && !force {
        inner.set_status(SyncStatus::Idle);
        return;
    }

    info!(
        devices = plan.device_updates.len(),
        creations = plan.creations.len(),
        updates = plan.updates.len(),
        "reconciliation pass started"
    );
    inner.set_status(SyncStatus::Reconciling);
    inner.emit(SessionEvent::ReconcileStarted {
        changes: plan.len(),
    });

    match execute(inner, &plan).await {
        Ok(summary) => {
            info!(
                devices = summary.devices,
                created = summary.created,
                updated = summary.updated,
                "reconciliation pass completed"
            );
            inner.set_status(SyncStatus::Idle);
            inner.emit(SessionEvent::ReconcileCompleted {
                devices: summary.devices,
                created: summary.created,
                updated: summary.updated,
            });
        }
        Err(e) => {
            warn!(error = %e, "reconciliation pass failed");
            let message = e.to_string();
            inner.set_status(SyncStatus::Failed {
                message: message.clone(),
            });
            inner.emit(SessionEvent::ReconcileFailed { message });
        }
    }
}

async fn execute<G: PersistenceGateway>(
    inner: &SessionInner<G>,
    plan: &ReconcilePlan,
) -> Result<PassSummary, CoreError> {
    // A disagreeing acknowledgement is committed all the same; it fails
    // the pass only after the refresh.
    let mut disagreement = None;
    if !plan.is_empty() {
        let ack = push_plan(&inner.gateway, plan).await?;
        let committed = inner.lock_store().commit_sent(plan, &ack);
        inner.forward_deletions();
        match committed {
            Ok(()) => debug!("acknowledged writes committed"),
            Err(e) => disagreement = Some(e),
        }
    }

    let (devices, cables) =
        tokio::try_join!(inner.gateway.list_devices(), inner.gateway.list_cables())?;
    inner.lock_store().apply_refresh(devices, cables)?;
    match disagreement {
        Some(e) => Err(e),
        None => Ok(PassSummary::from(plan)),
    }
}
