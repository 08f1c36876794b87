//! Clap derive structures for the `fibermap` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use fibermap_core::Point;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fibermap -- edit a fiber-optic network topology from the command line
#[derive(Debug, Parser)]
#[command(
    name = "fibermap",
    version,
    about = "Edit fiber-optic network topologies from the command line",
    long_about = "Inspect and edit the devices and cables held by a fiber inventory service.\n\n\
        Every mutating command opens an editing session, applies the change,\n\
        pushes it to the inventory and exits once the inventory has it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Inventory profile to use
    #[arg(long, short = 'p', env = "FIBERMAP_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Topology API base URL (overrides profile)
    #[arg(long, short = 'u', env = "FIBERMAP_URL", global = true)]
    pub url: Option<String>,

    /// API token (overrides profile and keyring)
    #[arg(long, env = "FIBERMAP_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FIBERMAP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FIBERMAP_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FIBERMAP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect, move and delete devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect, reroute and delete cables
    #[command(alias = "c")]
    Cables(CablesArgs),

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List,

    /// List a device's ports and whether a cable holds them
    Ports {
        /// Device ID or name
        device: String,
    },

    /// Move a device; cable ends sitting on it follow
    #[command(alias = "mv")]
    Move {
        /// Device ID or name
        device: String,

        /// New latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// New longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },

    /// Delete a device and detach its cables
    #[command(alias = "rm")]
    Delete {
        /// Device ID or name
        device: String,
    },
}

// ── Cables ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CablesArgs {
    #[command(subcommand)]
    pub command: CablesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CablesCommand {
    /// List cables
    #[command(alias = "ls")]
    List,

    /// Show one cable with its full path
    Get {
        /// Cable ID or name
        cable: String,
    },

    /// Replace a cable's waypoints (its ends stay put)
    Route {
        /// Cable ID or name
        cable: String,

        /// Waypoint as `lat,lng`; repeat in path order. None clears the route.
        #[arg(long = "waypoint", short = 'w', value_parser = parse_point, allow_hyphen_values = true)]
        waypoints: Vec<Point>,
    },

    /// Delete a cable and free its ports
    #[command(alias = "rm")]
    Delete {
        /// Cable ID or name
        cable: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration (tokens redacted)
    Show,

    /// Store a profile's API token in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}

/// Parse `lat,lng`.
pub fn parse_point(raw: &str) -> Result<Point, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{raw}`"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate `{}`", s.trim()))
    };
    Ok(Point::new(parse(lat)?, parse(lng)?))
}
