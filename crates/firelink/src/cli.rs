//! Clap derive structures for the `firelink` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use firelink_core::{DeviceAction, Direction, FleetAction};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// firelink -- drive a fleet of firing controllers from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "firelink",
    version,
    about = "Monitor and command a fleet of pyrotechnic firing controllers",
    long_about = "Talks to the master controller for discovery, fleet-wide program\n\
        control and the heartbeat, and to each device directly for hardware\n\
        actions, firing and live status.",
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
    /// Master controller URL (overrides config)
    #[arg(long, short = 'm', env = "FIRELINK_MASTER", global = true)]
    pub master: Option<String>,

    /// Request timeout in milliseconds (overrides config)
    #[arg(long, env = "FIRELINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Enable controls for this invocation
    #[arg(long, short = 'e', global = true)]
    pub enable: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Output format (overrides config)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered devices with their status
    #[command(alias = "ls")]
    Devices,

    /// Discover devices on the network and register them
    Search,

    /// Remove one device from the master's registry
    Deregister {
        /// Device ID
        device: String,
    },

    /// Remove every device from the master's registry
    DeregisterAll,

    /// Move a device up or down in the displayed order
    Move {
        /// Device ID
        device: String,

        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Fleet-wide action sent through the master
    Fleet {
        #[arg(value_enum)]
        action: FleetCommand,
    },

    /// Schedule the loaded program for the next occurrence of a time of day
    Schedule {
        /// Local time of day, HH:MM or HH:MM:SS
        #[arg(value_name = "TIME")]
        time: String,
    },

    /// Upload a program file to the fleet
    Load {
        /// Program file (JSON event list)
        file: PathBuf,
    },

    /// Action on one device
    #[command(alias = "dev")]
    Device {
        /// Device ID
        device: String,

        #[arg(value_enum)]
        action: DeviceCommand,
    },

    /// Fire a single channel
    Fire {
        /// Device ID
        device: String,

        /// Channel, zone letter plus 0-based number (e.g. a3)
        channel: String,
    },

    /// Follow live device status until interrupted
    Watch {
        /// Only follow this device
        #[arg(long, short = 'd')]
        device: Option<String>,
    },

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Action value enums ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(value: MoveDirection) -> Self {
        match value {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

/// Fleet actions that need no extra input (`load` and `schedule` have
/// their own subcommands).
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FleetCommand {
    Lock,
    Unlock,
    Play,
    Pause,
    Continue,
    Stop,
    Testloop,
    Unload,
    Unschedule,
}

impl From<FleetCommand> for FleetAction {
    fn from(value: FleetCommand) -> Self {
        match value {
            FleetCommand::Lock => FleetAction::Lock,
            FleetCommand::Unlock => FleetAction::Unlock,
            FleetCommand::Play => FleetAction::Play,
            FleetCommand::Pause => FleetAction::Pause,
            FleetCommand::Continue => FleetAction::Continue,
            FleetCommand::Stop => FleetAction::Stop,
            FleetCommand::Testloop => FleetAction::Testloop,
            FleetCommand::Unload => FleetAction::Unload,
            FleetCommand::Unschedule => FleetAction::Unschedule,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DeviceCommand {
    Shutdown,
    Reboot,
    Testloop,
    Lock,
    Unlock,
    Update,
}

impl From<DeviceCommand> for DeviceAction {
    fn from(value: DeviceCommand) -> Self {
        match value {
            DeviceCommand::Shutdown => DeviceAction::Shutdown,
            DeviceCommand::Reboot => DeviceAction::Reboot,
            DeviceCommand::Testloop => DeviceAction::Testloop,
            DeviceCommand::Lock => DeviceAction::Lock,
            DeviceCommand::Unlock => DeviceAction::Unlock,
            DeviceCommand::Update => DeviceAction::Update,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a config file interactively
    Init,

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
