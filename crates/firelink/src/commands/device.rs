//! Per-device command handlers.

use firelink_core::{DeviceAction, Fleet};

use crate::commands::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn run(
    fleet: &Fleet,
    device_id: &str,
    action: DeviceAction,
    ctx: Ctx,
) -> Result<(), CliError> {
    fleet.load_devices().await?;
    util::require_device_action(fleet, device_id, action)?;

    let result = fleet.run_device(device_id, action).await?;
    util::settle(fleet, action.into(), result)?;
    output::print_output(&format!("{device_id}: {action} done"), ctx.quiet);
    Ok(())
}

pub async fn fire(fleet: &Fleet, device_id: &str, channel: &str, ctx: Ctx) -> Result<(), CliError> {
    let (letter, number) = util::parse_channel(channel)?;
    fleet.load_devices().await?;
    let device = util::require_device_action(fleet, device_id, DeviceAction::Fire)?;
    util::check_channel(&device, letter, number)?;

    let result = fleet.fire(device_id, letter, number).await?;
    util::settle(fleet, "fire", result)?;
    output::print_output(
        &format!("Fired {device_id}:{}{number}", letter.to_ascii_uppercase()),
        ctx.quiet,
    );
    Ok(())
}
