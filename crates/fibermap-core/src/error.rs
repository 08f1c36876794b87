// ── Core error types ──
//
// Session-facing errors from fibermap-core. Synchronous editing
// operations only ever return the validation/lookup/conflict variants;
// the remote variants surface exclusively from reconciliation passes.
// The `From<fibermap_api::Error>` impl translates transport-layer errors.

use thiserror::Error;

use crate::model::{CableEnd, CableRef, EntityId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Editing errors (state unchanged) ─────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Port {port_id} is already used by cable {holder} ({end} end)")]
    PortConflict {
        port_id: EntityId,
        holder: CableRef,
        end: CableEnd,
    },

    #[error("Cable not found: {cable}")]
    CableNotFound { cable: CableRef },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Port {port_id} does not belong to device {device_id}")]
    PortNotFound {
        port_id: EntityId,
        device_id: EntityId,
    },

    #[error("No port selection is pending for cable {cable}")]
    NoPendingSelection { cable: CableRef },

    // ── Remote errors (reconciliation only) ──────────────────────────
    #[error("Remote operation '{operation}' failed: {message}")]
    RemoteOperationFailure {
        operation: String,
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Inventory returned inconsistent data: {message}")]
    RemoteInconsistency { message: String },

    // ── Lifecycle / configuration ────────────────────────────────────
    #[error("Session is closed")]
    SessionClosed,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a gateway error with the name of the failing step.
    pub(crate) fn remote(operation: impl Into<String>, err: &fibermap_api::Error) -> Self {
        Self::RemoteOperationFailure {
            operation: operation.into(),
            message: err.to_string(),
            status: err.status(),
        }
    }

    /// Errors that abort a reconciliation pass.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteOperationFailure { .. } | Self::RemoteInconsistency { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fibermap_api::Error> for CoreError {
    fn from(err: fibermap_api::Error) -> Self {
        match err {
            fibermap_api::Error::Deserialization { message, body: _ } => {
                CoreError::RemoteInconsistency {
                    message: format!("undecodable response: {message}"),
                }
            }
            fibermap_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fibermap_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            other => CoreError::remote("request", &other),
        }
    }
}
