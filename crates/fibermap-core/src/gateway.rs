// ── Persistence gateway ──
//
// The remote store the session reconciles against. The session only
// ever talks to this trait; `InventoryClient` is the HTTP
// implementation, and tests substitute an in-memory one.

use std::future::Future;

use fibermap_api::{InventoryClient, RecordId};
use tracing::warn;

use crate::convert;
use crate::error::CoreError;
use crate::model::{Cable, Device, DeviceType, EntityId, Point};

/// Remote operations the session depends on.
pub trait PersistenceGateway: Send + Sync + 'static {
    /// All devices with their ports.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;

    /// All cables with paths and terminations.
    fn list_cables(&self) -> impl Future<Output = Result<Vec<Cable>, CoreError>> + Send;

    /// Persist a draft whose ends both have ports. Returns the canonical
    /// record, carrying the server-issued id.
    fn create_cable(
        &self,
        cable: &Cable,
    ) -> impl Future<Output = Result<Cable, CoreError>> + Send;

    /// Replace the path (`[from, ..waypoints, to]`) of a persisted cable.
    fn update_cable_path(
        &self,
        id: &EntityId,
        path: &[Point],
    ) -> impl Future<Output = Result<Cable, CoreError>> + Send;

    fn delete_cable(&self, id: &EntityId) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn update_device_position(
        &self,
        device_type: &DeviceType,
        id: &EntityId,
        position: Point,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete_device(
        &self,
        device_type: &DeviceType,
        id: &EntityId,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Attribute a transport error to the gateway operation that hit it.
fn failed(operation: &'static str) -> impl FnOnce(fibermap_api::Error) -> CoreError {
    move |err| match err {
        fibermap_api::Error::Deserialization { message, .. } => CoreError::RemoteInconsistency {
            message: format!("{operation}: {message}"),
        },
        other => CoreError::remote(operation, &other),
    }
}

fn route(device_type: &DeviceType) -> Result<&'static str, CoreError> {
    device_type.resource_path().ok_or_else(|| {
        CoreError::validation(format!("no inventory route for device type '{device_type}'"))
    })
}

impl PersistenceGateway for InventoryClient {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let records = InventoryClient::list_devices(self)
            .await
            .map_err(failed("list devices"))?;

        // A device without coordinates cannot be placed on the map; skip
        // it rather than failing the whole refresh.
        Ok(records
            .into_iter()
            .filter_map(|r| match Device::try_from(r) {
                Ok(device) => Some(device),
                Err(e) => {
                    warn!(error = %e, "skipping unmappable device");
                    None
                }
            })
            .collect())
    }

    async fn list_cables(&self) -> Result<Vec<Cable>, CoreError> {
        InventoryClient::list_cables(self)
            .await
            .map_err(failed("list cables"))?
            .into_iter()
            .map(Cable::try_from)
            .collect()
    }

    async fn create_cable(&self, cable: &Cable) -> Result<Cable, CoreError> {
        let payload = convert::create_payload(cable)?;
        let record = InventoryClient::create_cable(self, &payload)
            .await
            .map_err(failed("create cable"))?;
        Cable::try_from(record)
    }

    async fn update_cable_path(&self, id: &EntityId, path: &[Point]) -> Result<Cable, CoreError> {
        let payload = convert::path_payload(path);
        let mut record = InventoryClient::update_cable_path(self, &RecordId::from(id), &payload)
            .await
            .map_err(failed("update cable path"))?;
        // Some deployments answer a PATCH without echoing the id.
        if record.id.is_none() {
            record.id = Some(RecordId::from(id));
        }
        Cable::try_from(record)
    }

    async fn delete_cable(&self, id: &EntityId) -> Result<(), CoreError> {
        InventoryClient::delete_cable(self, &RecordId::from(id))
            .await
            .map_err(failed("delete cable"))
    }

    async fn update_device_position(
        &self,
        device_type: &DeviceType,
        id: &EntityId,
        position: Point,
    ) -> Result<(), CoreError> {
        let resource = route(device_type)?;
        InventoryClient::update_device_position(
            self,
            resource,
            &RecordId::from(id),
            convert::position_payload(position),
        )
        .await
        .map_err(failed("update device position"))
    }

    async fn delete_device(&self, device_type: &DeviceType, id: &EntityId) -> Result<(), CoreError> {
        let resource = route(device_type)?;
        InventoryClient::delete_device(self, resource, &RecordId::from(id))
            .await
            .map_err(failed("delete device"))
    }
}
