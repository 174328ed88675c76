//! Live status until Ctrl-C.
//!
//! One line per device per second, coloured by staleness. The master
//! heartbeat keeps the roster in step with the registry meanwhile.

use std::time::Duration;

use firelink_core::derive::{self, displayed_system_time, status_text};
use firelink_core::{DeviceView, Fleet, LinkState, MasterView};
use tokio::time::MissedTickBehavior;

use crate::commands::Ctx;
use crate::error::CliError;
use crate::output;

const REFRESH: Duration = Duration::from_secs(1);

pub async fn handle(fleet: &Fleet, device_id: Option<&str>, ctx: Ctx) -> Result<(), CliError> {
    fleet.load_devices().await?;
    if let Some(id) = device_id {
        if !fleet.roster().contains(id) {
            return Err(CliError::NotFound {
                device_id: id.into(),
            });
        }
    } else {
        fleet.watch_heartbeat().await?;
    }

    let mut ticker = tokio::time::interval(REFRESH);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => render(fleet, device_id, ctx).await?,
        }
    }

    fleet.shutdown().await;
    Ok(())
}

async fn render(fleet: &Fleet, only: Option<&str>, ctx: Ctx) -> Result<(), CliError> {
    let ids = match only {
        Some(id) => vec![id.to_owned()],
        None => {
            fleet.watch_devices().await?;
            fleet.roster().ids()
        }
    };

    let mut lines = Vec::with_capacity(ids.len() + 1);
    if only.is_none() {
        lines.push(master_line(&fleet.master_view().latest(), ctx.color));
    }
    for id in ids {
        let view = fleet.watch_device(&id).await?.latest();
        lines.push(device_line(&id, &view, ctx.color));
    }
    output::print_output(&lines.join("\n"), ctx.quiet);
    Ok(())
}

fn master_line(master: &MasterView, color: bool) -> String {
    let time = output::paint(&master.displayed_time(), master.staleness().color(), color);
    format!("{time}  master")
}

fn device_line(id: &str, view: &DeviceView, color: bool) -> String {
    let staleness = view.staleness().color();
    let Some(state) = view.state.as_ref().filter(|_| view.link == LinkState::Live) else {
        return format!("--:--:--  {id}  connecting");
    };

    let time = output::paint(&displayed_system_time(&state.system_time), staleness, color);
    let status = output::paint(
        &state.controller_state.to_string(),
        derive::status_color(state.controller_state),
        color,
    );
    let lock = output::paint(
        if state.is_locked { "locked" } else { "unlocked" },
        derive::lock_color(state.is_locked),
        color,
    );
    let program = status_text(Some(state));
    let mut line = format!("{time}  {id}  {status}  {lock}");
    if !program.is_empty() {
        line.push_str("  ");
        line.push_str(&program);
    }
    if view.last_event_age_seconds > 1 {
        line.push_str(&format!("  ({}s since last update)", view.last_event_age_seconds));
    }
    line
}
