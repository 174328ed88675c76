// ── Domain model ──
//
// Canonical types consumed by the store, the derivation layer and the CLI.
// Wire payloads are turned into these by `crate::convert`.

pub mod device;

pub use device::{
    ControllerState, DeviceState, FleetHeartbeat, FuseAddress, FuseCommand, Program, Schedule,
};
