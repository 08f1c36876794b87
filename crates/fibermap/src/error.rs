//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fibermap_config::ConfigError;
use fibermap_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const REMOTE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("No inventory configured")]
    #[diagnostic(
        code(fibermap::no_config),
        help(
            "Pass --url and --token, or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(fibermap::no_credentials),
        help(
            "Store one with: fibermap config set-token --profile {profile}\n\
             Or set the FIBERMAP_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fibermap::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(fibermap::config))]
    Config(Box<ConfigError>),

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fibermap::not_found),
        help("Run: fibermap {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(fibermap::port_conflict),
        help("Run: fibermap devices ports <device> to see which ports are free")
    )]
    PortConflict { message: String },

    // ── Remote ───────────────────────────────────────────────────────

    #[error("Inventory operation '{operation}' failed: {message}")]
    #[diagnostic(
        code(fibermap::remote),
        help("Local changes were not saved. Check connectivity and re-run the command.")
    )]
    Remote {
        operation: String,
        message: String,
        status: Option<u16>,
    },

    #[error("Inventory returned inconsistent data: {message}")]
    #[diagnostic(code(fibermap::inconsistent))]
    Inconsistent { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fibermap::validation))]
    Validation { field: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fibermap::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(fibermap::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(fibermap::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCredentials { .. }
            | Self::Remote {
                status: Some(401 | 403),
                ..
            } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::PortConflict { .. } => exit_code::CONFLICT,
            Self::Remote { .. } | Self::Inconsistent { .. } => exit_code::REMOTE,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            err @ CoreError::PortConflict { .. } => CliError::PortConflict {
                message: err.to_string(),
            },

            CoreError::CableNotFound { cable } => CliError::NotFound {
                resource_type: "cable".into(),
                identifier: cable.to_string(),
                list_command: "cables list".into(),
            },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "devices list".into(),
            },

            CoreError::PortNotFound { port_id, device_id } => CliError::NotFound {
                resource_type: "port".into(),
                identifier: format!("{port_id} on device {device_id}"),
                list_command: format!("devices ports {device_id}"),
            },

            CoreError::NoPendingSelection { cable } => CliError::Validation {
                field: "cable".into(),
                reason: format!("no port selection pending for {cable}"),
            },

            CoreError::RemoteOperationFailure {
                operation,
                message,
                status,
            } => CliError::Remote {
                operation,
                message,
                status,
            },

            CoreError::RemoteInconsistency { message } => CliError::Inconsistent { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::SessionClosed => CliError::Internal("editing session already closed".into()),

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
