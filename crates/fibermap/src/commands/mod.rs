//! Command dispatch: bridges CLI args -> session edits -> output formatting.

pub mod cables;
pub mod config_cmd;
pub mod devices;
pub mod util;

use fibermap_api::InventoryClient;
use fibermap_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// A session against the HTTP inventory.
pub type InventorySession = Session<InventoryClient>;

/// Dispatch an inventory-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &InventorySession,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(session, args, global).await,
        Command::Cables(args) => cables::handle(session, args, global).await,
        // Config and Completions are handled before a session is opened
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need an inventory session".into(),
        )),
    }
}
