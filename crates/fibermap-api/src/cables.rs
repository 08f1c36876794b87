// Cable endpoints

use tracing::debug;

use crate::client::InventoryClient;
use crate::error::Error;
use crate::models::{
    CableRecord, CreateCablePayload, ListResponse, RecordId, UpdateCablePathPayload,
};

impl InventoryClient {
    /// List all cables with their paths and terminations.
    ///
    /// `GET cables/`
    pub async fn list_cables(&self) -> Result<Vec<CableRecord>, Error> {
        let url = self.api_url("cables/")?;
        let page: ListResponse<CableRecord> = self.get(url).await?;
        let cables = page.into_items();
        debug!(count = cables.len(), "listed cables");
        Ok(cables)
    }

    /// Create a cable between two ports.
    ///
    /// `POST cables/`
    pub async fn create_cable(&self, payload: &CreateCablePayload) -> Result<CableRecord, Error> {
        let url = self.api_url("cables/")?;
        self.post(url, payload).await
    }

    /// Replace the path of an existing cable.
    ///
    /// `PATCH cables/{id}/` with `{cable: {path: {coords}}}`
    pub async fn update_cable_path(
        &self,
        id: &RecordId,
        payload: &UpdateCablePathPayload,
    ) -> Result<CableRecord, Error> {
        let url = self.api_url(&format!("cables/{id}/"))?;
        self.patch(url, payload).await
    }

    /// Delete a cable.
    ///
    /// `DELETE cables/{id}/`
    pub async fn delete_cable(&self, id: &RecordId) -> Result<(), Error> {
        let url = self.api_url(&format!("cables/{id}/"))?;
        self.delete(url).await
    }
}
