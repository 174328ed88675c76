//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use firelink_core::derive::{chip_letters, fuses_per_chip};
use firelink_core::{Confirm, DeviceAction, DeviceState, Fleet, FleetAction};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::CliError;

// ── Confirmation ────────────────────────────────────────────────────

/// Operator prompt backed by `dialoguer`.
///
/// With `--yes` every prompt is approved, including the ones the gateway
/// always asks. Without a terminal nothing can be confirmed.
pub struct TerminalConfirm {
    pub assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !std::io::stdin().is_terminal() {
            tracing::warn!(prompt, "no terminal to confirm on; declining");
            return false;
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

// ── Outcome of a gateway command ────────────────────────────────────

/// Turn the gateway's `Option` into a CLI result.
///
/// `None` means either a declined prompt or a failure; the session banner
/// tells them apart.
pub fn settle<T>(fleet: &Fleet, action: &str, result: Option<T>) -> Result<T, CliError> {
    if let Some(value) = result {
        return Ok(value);
    }
    let session = fleet.session();
    if session.error_occurred() {
        return Err(CliError::CommandFailed {
            message: session
                .last_error()
                .unwrap_or_else(|| format!("{action} failed")),
        });
    }
    Err(CliError::Cancelled {
        action: action.into(),
    })
}

// ── Enablement gates ────────────────────────────────────────────────

const DISABLED_HINT: &str = "Controls are disabled. Pass --enable (-e) or set enabled = true in the config.";

pub fn require_fleet_action(fleet: &Fleet, action: FleetAction) -> Result<(), CliError> {
    if fleet.fleet_action_enabled(action) {
        return Ok(());
    }
    let reason = if !fleet.session().enabled() {
        DISABLED_HINT.to_owned()
    } else if fleet.roster().is_empty() {
        "No devices are registered. Run: firelink search".to_owned()
    } else {
        format!("No registered device is in a state that accepts '{action}'.")
    };
    Err(CliError::Disabled {
        action: action.to_string(),
        reason,
    })
}

pub fn require_device_action(
    fleet: &Fleet,
    device_id: &str,
    action: DeviceAction,
) -> Result<DeviceState, CliError> {
    let device = fleet
        .roster()
        .get(device_id)
        .ok_or_else(|| CliError::NotFound {
            device_id: device_id.into(),
        })?;
    if fleet.device_action_enabled(device_id, action) {
        return Ok(device);
    }
    let reason = if fleet.session().enabled() {
        format!(
            "{device_id} is {} and {}.",
            device.controller_state,
            if device.is_locked { "locked" } else { "unlocked" }
        )
    } else {
        DISABLED_HINT.to_owned()
    };
    Err(CliError::Disabled {
        action: action.to_string(),
        reason,
    })
}

// ── Channel parsing ─────────────────────────────────────────────────

/// Parse a channel like `a3` into its zone letter and 0-based number.
pub fn parse_channel(channel: &str) -> Result<(char, u32), CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "channel".into(),
        reason: format!("'{channel}': {reason}"),
    };
    let mut chars = channel.chars();
    let letter = chars
        .next()
        .filter(char::is_ascii_alphabetic)
        .ok_or_else(|| invalid("must start with a zone letter"))?
        .to_ascii_lowercase();
    let number = chars
        .as_str()
        .parse::<u32>()
        .map_err(|_| invalid("expected a channel number after the letter"))?;
    Ok((letter, number))
}

/// Check a channel against the device's zones and per-zone channel count.
pub fn check_channel(device: &DeviceState, letter: char, number: u32) -> Result<(), CliError> {
    let letters = chip_letters(device.chip_amount);
    if !letters.is_empty() && !letters.contains(&letter) {
        return Err(CliError::Validation {
            field: "channel".into(),
            reason: format!(
                "{} has zones {}",
                device.device_id,
                letters.iter().collect::<String>()
            ),
        });
    }
    let per_chip = fuses_per_chip(device);
    if number >= per_chip {
        return Err(CliError::Validation {
            field: "channel".into(),
            reason: format!("numbers run from 0 to {}", per_chip.saturating_sub(1)),
        });
    }
    Ok(())
}

// ── Progress ────────────────────────────────────────────────────────

/// Spinner on stderr, or nothing when quiet.
pub fn spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}
