//! Roster command handlers: list, search, deregister, reorder.

use firelink_core::derive::{self, displayed_system_time, status_text};
use firelink_core::{DeviceAction, DeviceState, Direction, Fleet, FleetAction};
use tabled::Tabled;

use crate::commands::Ctx;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Program")]
    program: String,
    #[tabled(rename = "Lock")]
    lock: String,
    #[tabled(rename = "Update")]
    update: String,
    #[tabled(rename = "Time")]
    time: String,
}

fn row(d: &DeviceState, color: bool) -> DeviceRow {
    let lock = if d.is_locked { "locked" } else { "unlocked" };
    DeviceRow {
        id: d.device_id.clone(),
        ip: d.ip_address.clone().unwrap_or_else(|| "-".into()),
        state: output::paint(
            &d.controller_state.to_string(),
            derive::status_color(d.controller_state),
            color,
        ),
        program: status_text(Some(d)),
        lock: output::paint(lock, derive::lock_color(d.is_locked), color),
        update: if d.update_needed { "available".into() } else { String::new() },
        time: displayed_system_time(&d.system_time),
    }
}

fn render_roster(fleet: &Fleet, ctx: Ctx) {
    let devices: Vec<DeviceState> = fleet.roster().snapshot().devices.into_values().collect();
    let out = output::render_list(
        ctx.output,
        &devices,
        |d| row(d, ctx.color),
        |d| d.device_id.clone(),
    );
    output::print_output(&out, ctx.quiet);
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(fleet: &Fleet, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    render_roster(fleet, ctx);
    Ok(())
}

pub async fn search(fleet: &Fleet, ctx: Ctx) -> Result<(), CliError> {
    // A spinner would fight with the confirmation prompt.
    let bar = if fleet.session().ask_confirmation() {
        None
    } else {
        util::spinner("Searching for devices...", ctx.quiet)
    };
    let result = fleet.search().await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let ids = util::settle(fleet, "search", result)?;
    if ids.is_empty() && !ctx.quiet {
        eprintln!("No devices found");
    }
    render_roster(fleet, ctx);
    Ok(())
}

pub async fn deregister(fleet: &Fleet, device_id: &str, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    util::require_device_action(fleet, device_id, DeviceAction::Deregister)?;

    let result = fleet.deregister(device_id).await;
    let removed = util::settle(fleet, "deregister", result)?;
    output::print_output(&format!("Deregistered {removed}"), ctx.quiet);
    Ok(())
}

pub async fn deregister_all(fleet: &Fleet, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    util::require_fleet_action(fleet, FleetAction::DeregisterAll)?;

    let count = fleet.roster().len();
    let ok = fleet.deregister_all().await;
    util::settle(fleet, "deregister_all", ok.then_some(()))?;
    output::print_output(&format!("Deregistered {count} device(s)"), ctx.quiet);
    Ok(())
}

/// Reorder locally and print the resulting order. The master keeps its own.
pub async fn move_device(
    fleet: &Fleet,
    device_id: &str,
    direction: Direction,
    ctx: Ctx,
) -> Result<(), CliError> {
    fleet.load_devices().await?;
    let action = match direction {
        Direction::Up => DeviceAction::MoveUp,
        Direction::Down => DeviceAction::MoveDown,
    };
    util::require_device_action(fleet, device_id, action)?;

    fleet.run_device(device_id, action).await?;
    render_roster(fleet, ctx);
    Ok(())
}
