//! Shared helpers for command handlers.

use std::io::IsTerminal;

use fibermap_core::{Cable, CableRef, EntityId};

use super::InventorySession;
use crate::error::CliError;

/// Resolve a cable identifier (ID or exact name).
pub fn resolve_cable(session: &InventorySession, identifier: &str) -> Result<Cable, CliError> {
    let by_id = CableRef::Persisted(EntityId::from(identifier));
    if let Some(cable) = session.cable(&by_id) {
        return Ok(cable);
    }
    session
        .cables()
        .into_iter()
        .find(|c| c.name == identifier)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "cable".into(),
            identifier: identifier.into(),
            list_command: "cables list".into(),
        })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// `device/port` label of a cable end.
pub fn endpoint_label(session: &InventorySession, endpoint: &fibermap_core::Endpoint) -> String {
    let Some(device_id) = &endpoint.device_id else {
        return "-".into();
    };
    let device = session
        .device(device_id)
        .map_or_else(|| device_id.to_string(), |d| d.label());
    match (&endpoint.port_name, &endpoint.port_id) {
        (Some(name), _) => format!("{device}/{name}"),
        (None, Some(port)) => format!("{device}/{port}"),
        (None, None) => format!("{device}/?"),
    }
}
