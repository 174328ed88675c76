// Wire types for device snapshots and the master heartbeat.
//
// Every field defaults so that partial or older firmware payloads still
// decode; semantic checks happen in `firelink-core`'s conversion layer.

use serde::{Deserialize, Serialize};

/// Full state snapshot of one device, as sent per event-stream message
/// and as each value of the `/devices` and `/search` maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDeviceState {
    pub controller: RawController,
    pub hardware: RawHardware,
    pub config: RawConfigEnvelope,
    pub program: Option<RawProgram>,
    pub schedule: Option<RawSchedule>,
    pub update_needed: bool,
    pub is_remote: bool,
    /// Only present on master-side listings.
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawController {
    /// Snake-case lifecycle name, e.g. `"not_loaded"`.
    pub state: String,
    pub system_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHardware {
    pub is_locked: bool,
}

impl Default for RawHardware {
    fn default() -> Self {
        Self { is_locked: true }
    }
}

/// `config` is nested one level deeper on the wire: `{"config": {"config": {...}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfigEnvelope {
    pub config: RawDeviceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDeviceConfig {
    pub device_id: String,
    pub chip_amount: u32,
    pub fuse_amounts: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProgram {
    pub name: String,
    pub current_timestamp: f64,
    pub command_list: Vec<RawFuseCommand>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFuseCommand {
    pub address: RawAddress,
    pub timestamp: f64,
    pub name: String,
    pub fired: bool,
    pub fireing: bool,
    pub faulty: bool,
    pub faulty_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAddress {
    pub device_id: String,
    pub letter: String,
    pub number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSchedule {
    pub scheduled_time: String,
}

/// Map of device id → snapshot, as returned by `/devices` and `/search`.
///
/// Order follows the response body, which is why this is not a `HashMap`.
pub type RawDeviceMap = Vec<(String, RawDeviceState)>;

/// Decode a `{id: snapshot, ...}` object preserving key order.
pub fn decode_device_map(value: &serde_json::Value) -> Result<RawDeviceMap, serde_json::Error> {
    let Some(object) = value.as_object() else {
        // `null` (empty body) is an empty roster; anything else is malformed.
        if value.is_null() {
            return Ok(Vec::new());
        }
        return Err(serde::de::Error::custom("expected a map of device snapshots"));
    };
    object
        .iter()
        .map(|(id, raw)| RawDeviceState::deserialize(raw).map(|state| (id.clone(), state)))
        .collect()
}

/// Master-level heartbeat carried by the master's event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHeartbeat {
    pub system_time: String,
    /// Absent on single-device hosts; only a present list drives pruning.
    pub device_ids: Option<Vec<String>>,
}

/// Success payload of `POST /deregister`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeregisterResponse {
    pub deregistered_device_id: String,
}
