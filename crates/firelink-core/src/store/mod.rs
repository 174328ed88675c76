// ── Observable stores ──
//
// `device` holds one live view per event stream; `roster` holds the
// ordered fleet. Both publish through `tokio::sync::watch`.

pub mod device;
pub mod roster;

pub use device::{DeviceMonitor, DeviceView, LinkState};
pub use roster::{Direction, FleetRoster, RosterSnapshot};
