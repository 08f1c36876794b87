// Device endpoints
//
// Listing is category-agnostic; position updates and deletion are routed
// through a per-category resource path chosen by the caller.

use tracing::debug;

use crate::client::InventoryClient;
use crate::error::Error;
use crate::models::{DevicePositionPayload, DeviceRecord, ListResponse, RecordId};

impl InventoryClient {
    /// List all devices with their embedded ports.
    ///
    /// `GET devices/`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        let url = self.api_url("devices/")?;
        let page: ListResponse<DeviceRecord> = self.get(url).await?;
        let devices = page.into_items();
        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    /// Move a device on the map.
    ///
    /// `PATCH {resource}/{id}/` with `{latitude, longitude}`
    pub async fn update_device_position(
        &self,
        resource: &str,
        id: &RecordId,
        position: DevicePositionPayload,
    ) -> Result<(), Error> {
        let url = self.api_url(&format!("{resource}/{id}/"))?;
        self.patch_discard(url, &position).await
    }

    /// Delete a device.
    ///
    /// `DELETE {resource}/{id}/`
    pub async fn delete_device(&self, resource: &str, id: &RecordId) -> Result<(), Error> {
        let url = self.api_url(&format!("{resource}/{id}/"))?;
        self.delete(url).await
    }
}
