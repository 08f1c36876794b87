//! Cable command handlers.

use tabled::Tabled;

use fibermap_core::Cable;

use crate::cli::{CablesArgs, CablesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{InventorySession, util};

#[derive(Tabled)]
struct CableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    ctype: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Waypoints")]
    waypoints: usize,
}

fn cable_row(session: &InventorySession, c: &Cable) -> CableRow {
    CableRow {
        id: c.id.to_string(),
        name: c.name.clone(),
        ctype: c.cable_type.clone(),
        start: util::endpoint_label(session, &c.start),
        end: util::endpoint_label(session, &c.end),
        waypoints: c.waypoints.len(),
    }
}

fn detail(session: &InventorySession, c: &Cable) -> String {
    let mut lines = vec![
        format!("ID:     {}", c.id),
        format!("Name:   {}", c.name),
        format!("Type:   {}", c.cable_type),
        format!("Start:  {}", util::endpoint_label(session, &c.start)),
        format!("End:    {}", util::endpoint_label(session, &c.end)),
        "Path:".to_owned(),
    ];
    lines.extend(
        c.path()
            .into_iter()
            .enumerate()
            .map(|(i, p)| format!("  {i:>3}  {}", output::fmt_point(p))),
    );
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &InventorySession,
    args: CablesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        CablesCommand::List => {
            let cables = session.cables();
            let out = output::render_list(
                &global.output,
                &cables,
                |c| cable_row(session, c),
                |c| c.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CablesCommand::Get { cable } => {
            let cable = util::resolve_cable(session, &cable)?;
            let out = output::render_single(
                &global.output,
                &cable,
                |c| detail(session, c),
                |c| c.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CablesCommand::Route { cable, waypoints } => {
            let cable = util::resolve_cable(session, &cable)?;
            let count = waypoints.len();
            session.set_waypoints(&cable.id, waypoints)?;
            session.flush().await?;
            if !global.quiet {
                eprintln!("Cable {} rerouted through {count} waypoint(s)", cable.name);
            }
            Ok(())
        }

        CablesCommand::Delete { cable } => {
            let cable = util::resolve_cable(session, &cable)?;
            if !util::confirm(&format!("Delete cable {}?", cable.name), global.yes)? {
                return Ok(());
            }
            session.delete_cable(&cable.id)?;
            session.flush().await?;
            if !global.quiet {
                eprintln!("Cable deleted");
            }
            Ok(())
        }
    }
}
