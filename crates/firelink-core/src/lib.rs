//! Fleet state and command workflow between `firelink-api` and the CLI.
//!
//! This crate owns the business logic of the firelink dashboard:
//!
//! - **[`Fleet`]**: facade for the fleet view. Loads and searches the
//!   roster, routes fleet and per-device commands, applies the master
//!   heartbeat and runs the live device subscriptions.
//!
//! - **[`CommandGateway`]**: the confirm → pending → send → settle
//!   workflow shared by every control, with a [`StatusBoard`] of sticky
//!   per-key [`CommandStatus`] values. Failures resolve to `None` and raise
//!   the [`Session`] error banner; they never propagate as errors.
//!
//! - **Stores** ([`store`]): [`DeviceView`]/[`DeviceMonitor`] keep one
//!   device's last snapshot plus a staleness counter; [`FleetRoster`] keeps
//!   the ordered device set. Both publish through `tokio::sync::watch`, read
//!   via [`StateStream`].
//!
//! - **Derivation** ([`derive`]): pure enablement predicates and display
//!   values (fuse status, icons, colours) over the current state.
//!
//! - **Domain model** ([`model`]): [`DeviceState`] and friends, converted
//!   from wire payloads by [`convert`] with invariant normalization.

pub mod command;
pub mod config;
pub mod convert;
pub mod derive;
pub mod error;
pub mod fleet;
pub mod gateway;
pub mod model;
pub mod program;
pub mod schedule;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{DEFAULT_DEVICE_PORT, FleetConfig};
pub use derive::{DeviceAction, FleetAction, FuseDisplay, FuseStatus, RosterPosition, Staleness};
pub use error::CoreError;
pub use fleet::{Fleet, MasterView};
pub use gateway::{AlwaysConfirm, CommandGateway, CommandKey, CommandStatus, Confirm, StatusBoard};
pub use model::{
    ControllerState, DeviceState, FleetHeartbeat, FuseAddress, FuseCommand, Program, Schedule,
};
pub use program::ProgramUpload;
pub use session::{Session, SessionFlags};
pub use store::{DeviceMonitor, DeviceView, Direction, FleetRoster, LinkState, RosterSnapshot};
pub use stream::StateStream;
