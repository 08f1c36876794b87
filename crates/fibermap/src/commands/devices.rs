//! Device command handlers.

use tabled::Tabled;

use fibermap_core::{Device, Point, Port};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{InventorySession, util};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Ports")]
    ports: String,
}

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "#")]
    position: u32,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Cable")]
    cable: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &InventorySession,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let devices = session.devices();
            let out = output::render_list(
                &global.output,
                &devices,
                |d| device_row(session, d),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Ports { device } => {
            let device = session.find_device(&device)?;
            let ports = session.ports(&device.id)?;
            let out = output::render_list(
                &global.output,
                &ports,
                |p| port_row(session, p),
                |p| p.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Move { device, lat, lng } => {
            let device = session.find_device(&device)?;
            let dragged = session.move_device(&device.id, Point::new(lat, lng))?;
            session.flush().await?;
            if !global.quiet {
                eprintln!(
                    "Device {} moved ({} cable end(s) followed)",
                    device.label(),
                    dragged.len()
                );
            }
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            let device = session.find_device(&device)?;
            let attached = session
                .cables()
                .iter()
                .filter(|c| {
                    [&c.start, &c.end]
                        .iter()
                        .any(|e| e.device_id.as_ref() == Some(&device.id))
                })
                .count();
            let prompt = format!(
                "Delete device {} and detach {attached} cable end(s)?",
                device.label()
            );
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            session.delete_device(&device.id)?;
            session.flush().await?;
            if !global.quiet {
                eprintln!("Device deleted");
            }
            Ok(())
        }
    }
}

fn device_row(session: &InventorySession, d: &Device) -> DeviceRow {
    let free = session.available_ports(&d.id).map_or(0, |p| p.len());
    DeviceRow {
        id: d.id.to_string(),
        name: d.name.clone().unwrap_or_default(),
        dtype: d.device_type.to_string(),
        position: output::fmt_point(d.position),
        ports: format!("{free}/{} free", d.ports.len()),
    }
}

fn port_row(session: &InventorySession, p: &Port) -> PortRow {
    let cable = session
        .read(|s| s.port_holder(&p.id).map(|claim| format!("{} ({})", claim.cable, claim.end)))
        .unwrap_or_else(|| "-".into());
    PortRow {
        position: p.position,
        id: p.id.to_string(),
        name: p.name.clone(),
        cable,
    }
}
