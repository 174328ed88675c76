//! Fleet-wide command handlers: program control, schedule, upload.

use std::path::Path;

use firelink_core::schedule::{display_date_time, parse_time_of_day};
use firelink_core::{Fleet, FleetAction};

use crate::commands::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn run(fleet: &Fleet, action: FleetAction, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    util::require_fleet_action(fleet, action)?;

    let result = fleet.run_fleet(action).await?;
    util::settle(fleet, action.into(), result)?;
    output::print_output(&format!("{action}: done"), ctx.quiet);
    Ok(())
}

pub async fn schedule(fleet: &Fleet, time: &str, ctx: Ctx) -> Result<(), CliError> {
    let time_of_day = parse_time_of_day(time)?;
    fleet.load_devices().await?;
    util::require_fleet_action(fleet, FleetAction::Schedule)?;

    let result = fleet.schedule_at(time_of_day).await;
    let at = util::settle(fleet, "schedule", result)?;
    output::print_output(
        &format!("Scheduled for {}", display_date_time(&at)),
        ctx.quiet,
    );
    Ok(())
}

pub async fn load(fleet: &Fleet, file: &Path, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    util::require_fleet_action(fleet, FleetAction::Load)?;

    let result = fleet.upload_program_file(file).await?;
    util::settle(fleet, "load", result)?;
    output::print_output(&format!("Uploaded {}", file.display()), ctx.quiet);
    Ok(())
}
