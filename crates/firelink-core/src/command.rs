// ── Command API ──
//
// Every outbound operation is a `Command` variant. A variant knows its
// endpoint request, the status-board key name it reports under, and the
// prompt shown before it is sent. Routing (master vs. device host) is
// decided by the caller.

use firelink_api::{ApiRequest, ProgramAction, requests};
use serde_json::Value;

/// All operations the dashboard can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Roster ───────────────────────────────────────────────────────
    ListDevices,
    Search,
    Deregister { device_id: String },
    DeregisterAll,

    // ── Hardware / system ────────────────────────────────────────────
    Lock,
    Unlock,
    Shutdown,
    Reboot,
    Testloop,
    Update,
    Fire {
        device_id: String,
        letter: char,
        number: u32,
    },

    // ── Program ──────────────────────────────────────────────────────
    Load { name: String, event_list: Value },
    Unload,
    Play,
    Pause,
    Continue,
    Stop,
    Schedule { time: String },
    Unschedule,
}

impl Command {
    /// Key name of the per-device deregister control.
    pub const DEREGISTER_KEY: &'static str = "deregister";

    /// The endpoint request this command sends.
    pub fn request(&self) -> ApiRequest {
        match self {
            Self::ListDevices => requests::list_devices(),
            Self::Search => requests::search(),
            Self::Deregister { device_id } => requests::deregister(device_id),
            Self::DeregisterAll => requests::deregister_all(),
            Self::Lock => requests::set_lock(true),
            Self::Unlock => requests::set_lock(false),
            Self::Shutdown => requests::shutdown(),
            Self::Reboot => requests::reboot(),
            Self::Testloop => requests::testloop(),
            Self::Update => requests::update(),
            Self::Fire { letter, number, .. } => requests::fire(*letter, *number),
            Self::Load { name, event_list } => requests::upload_program(name, event_list.clone()),
            Self::Unload => requests::delete_program(),
            Self::Play => requests::program_control(ProgramAction::Run, None),
            Self::Pause => requests::program_control(ProgramAction::Pause, None),
            Self::Continue => requests::program_control(ProgramAction::Continue, None),
            Self::Stop => requests::program_control(ProgramAction::Stop, None),
            Self::Schedule { time } => {
                requests::program_control(ProgramAction::Schedule, Some(time))
            }
            Self::Unschedule => requests::program_control(ProgramAction::Unschedule, None),
        }
    }

    /// Status-board key name, before any per-device suffix.
    pub fn key_name(&self) -> String {
        match self {
            Self::ListDevices => "devices".into(),
            Self::Search => "search".into(),
            Self::Deregister { .. } => Self::DEREGISTER_KEY.into(),
            Self::DeregisterAll => "deregister_all".into(),
            Self::Lock => "lock".into(),
            Self::Unlock => "unlock".into(),
            Self::Shutdown => "shutdown".into(),
            Self::Reboot => "reboot".into(),
            Self::Testloop => "testloop".into(),
            Self::Update => "update".into(),
            Self::Fire { letter, number, .. } => format!("fire_{letter}{number}"),
            Self::Load { .. } => "load".into(),
            Self::Unload => "unload".into(),
            Self::Play => "play".into(),
            Self::Pause => "pause".into(),
            Self::Continue => "continue".into(),
            Self::Stop => "stop".into(),
            Self::Schedule { .. } => "schedule".into(),
            Self::Unschedule => "unschedule".into(),
        }
    }

    /// Question put to the operator before sending.
    pub fn prompt(&self) -> String {
        match self {
            Self::ListDevices => "List devices?".into(),
            Self::Search => "Search for devices?".into(),
            Self::Deregister { device_id } => format!("Deregister {device_id}?"),
            Self::DeregisterAll => "Deregister all devices?".into(),
            Self::Lock => "Lock hardware?".into(),
            Self::Unlock => "Unlock hardware?".into(),
            Self::Shutdown => "Shutdown device?".into(),
            Self::Reboot => "Reboot device?".into(),
            Self::Testloop => "Run testloop?".into(),
            Self::Update => "Install updates?".into(),
            Self::Fire {
                device_id,
                letter,
                number,
            } => format!(
                "Fire {device_id}:{}{number}?",
                letter.to_ascii_uppercase()
            ),
            Self::Load { .. } => "Upload program?".into(),
            Self::Unload => "Delete program?".into(),
            Self::Play => "Run program?".into(),
            Self::Pause => "Pause program?".into(),
            Self::Continue => "Continue program?".into(),
            Self::Stop => "Stop program?".into(),
            Self::Schedule { time } => format!("Schedule program for {time}?"),
            Self::Unschedule => "Unschedule program?".into(),
        }
    }

    /// Commands that prompt even when the session has confirmation turned off.
    pub fn always_confirms(&self) -> bool {
        matches!(
            self,
            Self::Schedule { .. } | Self::Shutdown | Self::Reboot | Self::Update
        )
    }
}
