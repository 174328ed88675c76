// ── API-to-domain type conversions ──
//
// Bridges raw `firelink_api` payloads into `firelink_core::model` types.
// Conversion never fails: snapshots that break the controller-state
// invariants (schedule without `scheduled`, program without a program
// state) are normalized by dropping the offending part, with a warning.

use firelink_api::models::{RawAddress, RawDeviceMap, RawFuseCommand, RawProgram};
use firelink_api::{RawDeviceState, RawHeartbeat};
use tracing::{debug, warn};

use crate::model::{
    ControllerState, DeviceState, FleetHeartbeat, FuseAddress, FuseCommand, Program, Schedule,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Zone letters are single lowercase characters on the wire.
fn parse_letter(raw: &str) -> char {
    raw.chars()
        .next()
        .map_or('?', |c| c.to_ascii_lowercase())
}

// ── Device snapshot ────────────────────────────────────────────────

impl From<RawAddress> for FuseAddress {
    fn from(raw: RawAddress) -> Self {
        Self {
            letter: parse_letter(&raw.letter),
            device_id: raw.device_id,
            number: raw.number,
        }
    }
}

impl From<RawFuseCommand> for FuseCommand {
    fn from(raw: RawFuseCommand) -> Self {
        Self {
            address: raw.address.into(),
            timestamp: raw.timestamp,
            name: raw.name,
            fired: raw.fired,
            fireing: raw.fireing,
            faulty: raw.faulty,
            faulty_reason: raw.faulty_reason,
        }
    }
}

impl From<RawProgram> for Program {
    fn from(raw: RawProgram) -> Self {
        Self {
            name: raw.name,
            current_timestamp: raw.current_timestamp,
            command_list: raw.command_list.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RawDeviceState> for DeviceState {
    fn from(raw: RawDeviceState) -> Self {
        let controller_state = ControllerState::from_wire(&raw.controller.state);
        if controller_state == ControllerState::Initializing
            && !raw.controller.state.is_empty()
            && raw.controller.state != "initializing"
        {
            debug!(state = %raw.controller.state, "unknown controller state");
        }

        let device_id = raw.config.config.device_id;

        let mut schedule = raw.schedule.map(|s| Schedule {
            scheduled_time: s.scheduled_time,
        });
        if schedule.is_some() && controller_state != ControllerState::Scheduled {
            warn!(
                device_id = %device_id,
                state = %controller_state,
                "dropping schedule reported outside the scheduled state"
            );
            schedule = None;
        }

        let mut program = raw.program.map(Program::from);
        if program.is_some() && !controller_state.has_program() {
            warn!(
                device_id = %device_id,
                state = %controller_state,
                "dropping program reported without a loaded state"
            );
            program = None;
        }

        Self {
            device_id,
            ip_address: raw.ip_address,
            controller_state,
            is_locked: raw.hardware.is_locked,
            program,
            schedule,
            system_time: raw.controller.system_time,
            update_needed: raw.update_needed,
            is_remote: raw.is_remote,
            chip_amount: raw.config.config.chip_amount,
            fuse_amounts: raw.config.config.fuse_amounts,
        }
    }
}

/// Convert a master listing, keeping response order.
///
/// The map key is authoritative for the id; it also fills in snapshots
/// that omit `config.config.device_id`.
pub fn devices_from_raw(raw: RawDeviceMap) -> Vec<(String, DeviceState)> {
    raw.into_iter()
        .map(|(id, raw_state)| {
            let mut state = DeviceState::from(raw_state);
            if state.device_id.is_empty() {
                state.device_id.clone_from(&id);
            }
            (id, state)
        })
        .collect()
}

// ── Fleet heartbeat ────────────────────────────────────────────────

impl From<RawHeartbeat> for FleetHeartbeat {
    fn from(raw: RawHeartbeat) -> Self {
        Self {
            system_time: raw.system_time,
            device_ids: raw.device_ids,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawDeviceState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn schedule_outside_scheduled_state_is_dropped() {
        let state = DeviceState::from(raw(json!({
            "controller": {"state": "loaded"},
            "program": {"name": "p", "command_list": []},
            "schedule": {"scheduled_time": "2024-05-01T21:00:00.000"}
        })));
        assert!(state.schedule.is_none());
        assert!(state.program.is_some());
    }

    #[test]
    fn program_without_program_state_is_dropped() {
        let state = DeviceState::from(raw(json!({
            "controller": {"state": "not_loaded"},
            "program": {"name": "p", "command_list": []}
        })));
        assert!(state.program.is_none());
        assert_eq!(state.controller_state, ControllerState::NotLoaded);
    }

    #[test]
    fn consistent_scheduled_snapshot_is_kept() {
        let state = DeviceState::from(raw(json!({
            "controller": {"state": "scheduled", "system_time": "2024-05-01T20:00:00.000"},
            "hardware": {"is_locked": false},
            "config": {"config": {"device_id": "dev1", "chip_amount": 3}},
            "program": {"name": "finale", "current_timestamp": 0.0, "command_list": [
                {"address": {"device_id": "dev1", "letter": "B", "number": 4}, "timestamp": 2.0, "name": "B4"}
            ]},
            "schedule": {"scheduled_time": "2024-05-01T21:00:00.000"}
        })));
        assert_eq!(state.device_id, "dev1");
        assert!(!state.is_locked);
        assert_eq!(state.chip_amount, 3);
        let program = state.program.unwrap();
        assert_eq!(program.command_list[0].address.letter, 'b');
        assert_eq!(
            state.schedule.unwrap().scheduled_time,
            "2024-05-01T21:00:00.000"
        );
    }

    #[test]
    fn listing_key_fills_missing_device_id() {
        let devices = devices_from_raw(vec![("dev9".into(), RawDeviceState::default())]);
        assert_eq!(devices[0].0, "dev9");
        assert_eq!(devices[0].1.device_id, "dev9");
    }
}
