// ── Device domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Top-level lifecycle stage reported by a device.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ControllerState {
    #[default]
    Initializing,
    NotLoaded,
    Loaded,
    Scheduled,
    Running,
    Paused,
}

impl ControllerState {
    /// Parse the wire name; anything unrecognised is treated as still initializing.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// States in which a program may legitimately be present.
    pub fn has_program(self) -> bool {
        matches!(
            self,
            Self::Loaded | Self::Scheduled | Self::Running | Self::Paused
        )
    }
}

/// One firing output: zone letter plus 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuseAddress {
    pub device_id: String,
    pub letter: char,
    pub number: u32,
}

/// One timestamped entry of a loaded program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuseCommand {
    pub address: FuseAddress,
    /// Seconds from program start.
    pub timestamp: f64,
    pub name: String,
    pub fired: bool,
    /// Spelling follows the device firmware.
    pub fireing: bool,
    pub faulty: bool,
    pub faulty_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub current_timestamp: f64,
    pub command_list: Vec<FuseCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// ISO-8601 local time, e.g. `2024-05-01T21:00:00.000`.
    pub scheduled_time: String,
}

/// Last full snapshot received for one device.
///
/// Replaced wholesale on every event; never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: String,
    pub ip_address: Option<String>,
    pub controller_state: ControllerState,
    pub is_locked: bool,
    pub program: Option<Program>,
    pub schedule: Option<Schedule>,
    pub system_time: String,
    pub update_needed: bool,
    pub is_remote: bool,
    pub chip_amount: u32,
    pub fuse_amounts: Vec<u32>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            ip_address: None,
            controller_state: ControllerState::Initializing,
            is_locked: true,
            program: None,
            schedule: None,
            system_time: String::new(),
            update_needed: false,
            is_remote: false,
            chip_amount: 0,
            fuse_amounts: Vec::new(),
        }
    }
}

impl DeviceState {
    pub fn program_loaded(&self) -> bool {
        self.program.is_some()
    }
}

/// Master-level heartbeat: master clock plus the authoritative registered set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetHeartbeat {
    pub system_time: String,
    pub device_ids: Option<Vec<String>>,
}
