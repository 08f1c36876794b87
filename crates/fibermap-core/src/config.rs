// ── Runtime session configuration ──
//
// These types describe *how* an editing session behaves and *where* the
// inventory service lives. They carry credential data and tuning, but
// never touch disk: fibermap-config builds them and hands them in.

use std::time::Duration;

use fibermap_api::{InventoryClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (lab deployments with self-signed certs).
    DangerAcceptInvalid,
}

/// Where the inventory service lives and how to talk to it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the topology API (e.g. `https://inventory.example.net/api/topology/`).
    pub url: Url,
    /// API token sent as `Authorization: Token ...`.
    pub token: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    /// Build the HTTP gateway for this inventory.
    pub fn connect(&self) -> Result<InventoryClient, CoreError> {
        Ok(InventoryClient::new(
            self.url.clone(),
            &self.token,
            &self.transport(),
        )?)
    }
}

/// Tuning for one editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Quiet period after the last change before a reconciliation pass runs.
    pub debounce: Duration,
    /// Maximum depth of each of the undo and redo stacks.
    pub history_capacity: usize,
    /// Per-axis tolerance (degrees) for "point sits on a device".
    pub snap_epsilon: f64,
    /// Offset (degrees, both axes) of a new draft's `to` from its anchor.
    pub draft_offset: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            history_capacity: 20,
            snap_epsilon: 1e-6,
            draft_offset: 0.0005,
        }
    }
}

impl SessionConfig {
    /// Reject values that would make the session misbehave.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.history_capacity == 0 {
            return Err(CoreError::Config {
                message: "history capacity must be at least 1".into(),
            });
        }
        if !(self.snap_epsilon.is_finite() && self.snap_epsilon >= 0.0) {
            return Err(CoreError::Config {
                message: format!("invalid snap epsilon {}", self.snap_epsilon),
            });
        }
        if !self.draft_offset.is_finite() {
            return Err(CoreError::Config {
                message: format!("invalid draft offset {}", self.draft_offset),
            });
        }
        Ok(())
    }
}
