//! Command dispatch: bridges CLI args -> `Fleet` operations -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod devices;
pub mod fleet;
pub mod util;
pub mod watch;

use firelink_core::Fleet;

use crate::cli::{Command, OutputFormat};
use crate::error::CliError;

/// Per-invocation rendering settings.
#[derive(Debug, Clone, Copy)]
pub struct Ctx {
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

/// Dispatch a fleet-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, fleet: &Fleet, ctx: Ctx) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::list(fleet, ctx).await,
        Command::Search => devices::search(fleet, ctx).await,
        Command::Deregister { device } => devices::deregister(fleet, &device, ctx).await,
        Command::DeregisterAll => devices::deregister_all(fleet, ctx).await,
        Command::Move { device, direction } => {
            devices::move_device(fleet, &device, direction.into(), ctx).await
        }
        Command::Fleet { action } => fleet::run(fleet, action.into(), ctx).await,
        Command::Schedule { time } => fleet::schedule(fleet, &time, ctx).await,
        Command::Load { file } => fleet::load(fleet, &file, ctx).await,
        Command::Device { device, action } => {
            device::run(fleet, &device, action.into(), ctx).await
        }
        Command::Fire { device, channel } => device::fire(fleet, &device, &channel, ctx).await,
        Command::Watch { device } => watch::handle(fleet, device.as_deref(), ctx).await,
        // Config and Completions are handled before a fleet is built
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
