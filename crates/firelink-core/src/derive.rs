// ── Derivation layer ──
//
// Pure functions from device/fleet state to enablement predicates and
// display values. No I/O, no mutation.

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::model::{ControllerState, DeviceState, FuseCommand, Program};
use crate::schedule::display_date_time;

const ZONE_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
const DEFAULT_FUSES_PER_CHIP: u32 = 16;

// ── Per-device enablement ────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceAction {
    Shutdown,
    Reboot,
    Testloop,
    Lock,
    Unlock,
    Update,
    Fire,
    Deregister,
    MoveUp,
    MoveDown,
}

/// Where a device sits in the roster, for the move controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterPosition {
    pub is_first: bool,
    pub is_last: bool,
}

/// Lock flag as displayed: no snapshot yet reads as locked.
pub fn is_locked(state: Option<&DeviceState>) -> bool {
    state.is_none_or(|s| s.is_locked)
}

pub fn device_action_enabled(
    action: DeviceAction,
    state: Option<&DeviceState>,
    enabled: bool,
    position: RosterPosition,
) -> bool {
    match action {
        DeviceAction::MoveUp => return !position.is_first,
        DeviceAction::MoveDown => return !position.is_last,
        DeviceAction::Deregister => return enabled,
        _ => {}
    }

    let Some(state) = state else {
        return false;
    };
    if !enabled {
        return false;
    }

    match action {
        DeviceAction::Testloop => state.controller_state == ControllerState::NotLoaded,
        DeviceAction::Unlock => state.is_locked,
        DeviceAction::Lock => !state.is_locked,
        DeviceAction::Update => state.update_needed,
        DeviceAction::Fire => !state.is_locked && !state.is_remote && state.program.is_none(),
        DeviceAction::Shutdown
        | DeviceAction::Reboot
        | DeviceAction::Deregister
        | DeviceAction::MoveUp
        | DeviceAction::MoveDown => true,
    }
}

// ── Fleet enablement ─────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum FleetAction {
    Load,
    Unload,
    Play,
    Pause,
    Continue,
    Stop,
    Testloop,
    Schedule,
    Unschedule,
    Unlock,
    Lock,
    DeregisterAll,
}

impl FleetAction {
    /// Whether one device is in a state this action applies to.
    pub fn applies_to(self, device: &DeviceState) -> bool {
        let state = device.controller_state;
        match self {
            Self::Load | Self::Testloop => state == ControllerState::NotLoaded,
            Self::Unload => state != ControllerState::NotLoaded,
            Self::Play | Self::Schedule => state == ControllerState::Loaded,
            Self::Pause => state == ControllerState::Running,
            Self::Continue => state == ControllerState::Paused,
            Self::Stop => matches!(state, ControllerState::Running | ControllerState::Paused),
            Self::Unschedule => state == ControllerState::Scheduled,
            Self::Unlock => device.is_locked,
            Self::Lock => !device.is_locked,
            Self::DeregisterAll => true,
        }
    }
}

/// Enabled when at least one device can take the action, and the fleet is enabled.
pub fn fleet_action_enabled<'a>(
    action: FleetAction,
    devices: impl IntoIterator<Item = &'a DeviceState>,
    enabled: bool,
) -> bool {
    enabled && devices.into_iter().any(|d| action.applies_to(d))
}

// ── Fuse display ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FuseStatus {
    Ready,
    Unused,
    Staged,
    Fireing,
    Fired,
    Faulty,
}

impl FuseStatus {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Unused => "la-times-circle",
            Self::Ready => "la-check-circle",
            Self::Faulty => "la-exclamation-triangle",
            Self::Fireing | Self::Fired => "la-fire-alt",
            Self::Staged => "la-calendar-check",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Unused | Self::Fired => "gray",
            Self::Ready => "green",
            Self::Faulty => "red",
            Self::Fireing => "yellow",
            Self::Staged => "purple",
        }
    }
}

/// Command shown for one channel: the first not yet fired at that address,
/// else the last one there, else none.
pub fn select_fuse_command<'a>(
    program: &'a Program,
    device_id: &str,
    letter: char,
    number: u32,
) -> Option<&'a FuseCommand> {
    let mut last = None;
    for command in program.command_list.iter().filter(|c| {
        c.address.device_id == device_id && c.address.letter == letter && c.address.number == number
    }) {
        if !command.fired {
            return Some(command);
        }
        last = Some(command);
    }
    last
}

pub fn fuse_status(command: Option<&FuseCommand>, program_loaded: bool) -> FuseStatus {
    match command {
        None if program_loaded => FuseStatus::Unused,
        None => FuseStatus::Ready,
        Some(c) if c.faulty => FuseStatus::Faulty,
        Some(c) if c.fireing => FuseStatus::Fireing,
        Some(c) if c.fired => FuseStatus::Fired,
        Some(_) => FuseStatus::Staged,
    }
}

/// Everything the view shows for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuseDisplay {
    pub letter: char,
    pub number: u32,
    pub status: FuseStatus,
    pub name: String,
    pub faulty_reason: String,
    /// `-1.0` when no command targets the channel.
    pub timestamp: f64,
    /// `-1.0` when no command targets the channel.
    pub seconds_left: f64,
}

impl FuseDisplay {
    pub fn derive(state: &DeviceState, letter: char, number: u32) -> Self {
        let program = state.program.as_ref();
        let command =
            program.and_then(|p| select_fuse_command(p, &state.device_id, letter, number));
        let current = program.map_or(-1.0, |p| p.current_timestamp);

        Self {
            letter,
            number,
            status: fuse_status(command, program.is_some()),
            name: command.map(|c| c.name.clone()).unwrap_or_default(),
            faulty_reason: command.map(|c| c.faulty_reason.clone()).unwrap_or_default(),
            timestamp: command.map_or(-1.0, |c| c.timestamp),
            seconds_left: command.map_or(-1.0, |c| (c.timestamp - current).max(0.0)),
        }
    }

    /// Rounded countdown, or `-` for an unused channel.
    pub fn progress_label(&self) -> String {
        if self.command_present() {
            format!("{}", self.seconds_left.round())
        } else {
            "-".to_owned()
        }
    }

    fn command_present(&self) -> bool {
        self.seconds_left >= 0.0
    }
}

/// Every channel of a device, chip by chip.
pub fn fuse_grid(state: &DeviceState) -> Vec<(char, Vec<FuseDisplay>)> {
    let per_chip = fuses_per_chip(state);
    chip_letters(state.chip_amount)
        .into_iter()
        .map(|letter| {
            let fuses = (0..per_chip)
                .map(|number| FuseDisplay::derive(state, letter, number))
                .collect();
            (letter, fuses)
        })
        .collect()
}

// ── Device status display ────────────────────────────────────────────

pub fn status_icon(state: ControllerState) -> &'static str {
    match state {
        ControllerState::Initializing => "la-hourglass-half",
        ControllerState::NotLoaded => "la-expand",
        ControllerState::Loaded => "la-list-ol",
        ControllerState::Scheduled => "la-calendar-check",
        ControllerState::Running => "la-play",
        ControllerState::Paused => "la-pause-circle",
    }
}

pub fn status_color(state: ControllerState) -> &'static str {
    match state {
        ControllerState::Initializing | ControllerState::Paused => "yellow",
        ControllerState::NotLoaded => "gray",
        ControllerState::Loaded | ControllerState::Running => "green",
        ControllerState::Scheduled => "purple",
    }
}

/// Program name, plus the start time when scheduled. Empty when nothing
/// consistent is loaded.
pub fn status_text(state: Option<&DeviceState>) -> String {
    let Some(state) = state else {
        return String::new();
    };
    let Some(program) = state.program.as_ref() else {
        return String::new();
    };
    match state.controller_state {
        ControllerState::Loaded | ControllerState::Running | ControllerState::Paused => {
            program.name.clone()
        }
        ControllerState::Scheduled => state.schedule.as_ref().map_or_else(String::new, |s| {
            format!("{} > {}", program.name, display_date_time(&s.scheduled_time))
        }),
        ControllerState::Initializing | ControllerState::NotLoaded => String::new(),
    }
}

pub fn lock_icon(is_locked: bool) -> &'static str {
    if is_locked { "la-lock" } else { "la-lock-open" }
}

pub fn lock_color(is_locked: bool) -> &'static str {
    if is_locked { "red" } else { "green" }
}

/// `HH:MM:SS` part of a device clock, or `--:--:--` before the first event.
pub fn displayed_system_time(system_time: &str) -> String {
    system_time
        .split_once('T')
        .and_then(|(_, time)| time.split('.').next())
        .filter(|time| !time.is_empty())
        .map_or_else(|| "--:--:--".to_owned(), str::to_owned)
}

// ── Staleness ────────────────────────────────────────────────────────

/// Advisory freshness of a live feed, by seconds since the last event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Staleness {
    Fresh,
    Warning,
    Critical,
}

impl Staleness {
    pub fn from_age(seconds: u64) -> Self {
        match seconds {
            0..=1 => Self::Fresh,
            2..=5 => Self::Warning,
            _ => Self::Critical,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Fresh => "",
            Self::Warning => "yellow",
            Self::Critical => "red",
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────

/// Zone letters `a`, `b`, ... for `chip_amount` chips (at most 26).
pub fn chip_letters(chip_amount: u32) -> Vec<char> {
    ZONE_LETTERS
        .chars()
        .take(usize::try_from(chip_amount).unwrap_or(usize::MAX))
        .collect()
}

/// Channels per chip: 16, or the configured count on remote devices.
pub fn fuses_per_chip(state: &DeviceState) -> u32 {
    if state.is_remote {
        state
            .fuse_amounts
            .first()
            .copied()
            .unwrap_or(DEFAULT_FUSES_PER_CHIP)
    } else {
        DEFAULT_FUSES_PER_CHIP
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{FuseAddress, Schedule};
    use pretty_assertions::assert_eq;

    fn device(state: ControllerState) -> DeviceState {
        DeviceState {
            device_id: "dev1".into(),
            controller_state: state,
            ..DeviceState::default()
        }
    }

    fn command(letter: char, number: u32, fired: bool, name: &str) -> FuseCommand {
        FuseCommand {
            address: FuseAddress {
                device_id: "dev1".into(),
                letter,
                number,
            },
            timestamp: 5.0,
            name: name.into(),
            fired,
            fireing: false,
            faulty: false,
            faulty_reason: String::new(),
        }
    }

    fn program(commands: Vec<FuseCommand>) -> Program {
        Program {
            name: "finale.json".into(),
            current_timestamp: 2.0,
            command_list: commands,
        }
    }

    // ── Fuse selection ──

    #[test]
    fn selects_first_unfired() {
        let p = program(vec![
            command('a', 0, true, "one"),
            command('a', 0, true, "two"),
            command('a', 0, false, "three"),
        ]);
        assert_eq!(select_fuse_command(&p, "dev1", 'a', 0).unwrap().name, "three");
    }

    #[test]
    fn selects_last_when_all_fired() {
        let p = program(vec![
            command('a', 0, true, "one"),
            command('a', 0, true, "two"),
            command('a', 0, true, "three"),
        ]);
        assert_eq!(select_fuse_command(&p, "dev1", 'a', 0).unwrap().name, "three");
    }

    #[test]
    fn selects_nothing_for_empty_address() {
        let p = program(vec![command('b', 1, false, "other")]);
        assert!(select_fuse_command(&p, "dev1", 'a', 0).is_none());
        assert!(select_fuse_command(&p, "dev2", 'b', 1).is_none());
    }

    #[test]
    fn fuse_status_priority() {
        let mut c = command('a', 0, true, "x");
        c.fireing = true;
        c.faulty = true;
        assert_eq!(fuse_status(Some(&c), true), FuseStatus::Faulty);
        c.faulty = false;
        assert_eq!(fuse_status(Some(&c), true), FuseStatus::Fireing);
        c.fireing = false;
        assert_eq!(fuse_status(Some(&c), true), FuseStatus::Fired);
        c.fired = false;
        assert_eq!(fuse_status(Some(&c), true), FuseStatus::Staged);
        assert_eq!(fuse_status(None, true), FuseStatus::Unused);
        assert_eq!(fuse_status(None, false), FuseStatus::Ready);
    }

    #[test]
    fn fuse_display_countdown() {
        let mut state = device(ControllerState::Running);
        state.program = Some(program(vec![command('a', 3, false, "A3")]));

        let staged = FuseDisplay::derive(&state, 'a', 3);
        assert_eq!(staged.status, FuseStatus::Staged);
        assert!((staged.seconds_left - 3.0).abs() < f64::EPSILON);
        assert_eq!(staged.progress_label(), "3");

        let unused = FuseDisplay::derive(&state, 'a', 4);
        assert_eq!(unused.status, FuseStatus::Unused);
        assert_eq!(unused.progress_label(), "-");
    }

    #[test]
    fn fuse_grid_uses_chip_layout() {
        let mut state = device(ControllerState::NotLoaded);
        state.chip_amount = 2;
        let grid = fuse_grid(&state);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1].0, 'b');
        assert_eq!(grid[0].1.len(), 16);
        assert!(grid[0].1.iter().all(|f| f.status == FuseStatus::Ready));
    }

    // ── Enablement ──

    #[test]
    fn fleet_action_is_or_across_devices() {
        let devices = [
            device(ControllerState::NotLoaded),
            device(ControllerState::Loaded),
        ];
        assert!(fleet_action_enabled(FleetAction::Play, &devices, true));
        assert!(fleet_action_enabled(FleetAction::Load, &devices, true));
        assert!(!fleet_action_enabled(FleetAction::Pause, &devices, true));
        assert!(!fleet_action_enabled(FleetAction::Play, &devices, false));
    }

    #[test]
    fn deregister_all_needs_devices() {
        let none: [DeviceState; 0] = [];
        assert!(!fleet_action_enabled(FleetAction::DeregisterAll, &none, true));
        assert!(fleet_action_enabled(
            FleetAction::DeregisterAll,
            &[device(ControllerState::Initializing)],
            true
        ));
    }

    #[test]
    fn stop_applies_to_running_or_paused() {
        assert!(FleetAction::Stop.applies_to(&device(ControllerState::Paused)));
        assert!(FleetAction::Stop.applies_to(&device(ControllerState::Running)));
        assert!(!FleetAction::Stop.applies_to(&device(ControllerState::Loaded)));
    }

    #[test]
    fn device_actions_without_snapshot() {
        let pos = RosterPosition::default();
        assert!(!device_action_enabled(DeviceAction::Unlock, None, true, pos));
        assert!(device_action_enabled(DeviceAction::Deregister, None, true, pos));
        assert!(is_locked(None));
    }

    #[test]
    fn fire_needs_unlocked_local_device_without_program() {
        let pos = RosterPosition::default();
        let mut state = device(ControllerState::NotLoaded);
        assert!(!device_action_enabled(DeviceAction::Fire, Some(&state), true, pos));
        state.is_locked = false;
        assert!(device_action_enabled(DeviceAction::Fire, Some(&state), true, pos));
        state.is_remote = true;
        assert!(!device_action_enabled(DeviceAction::Fire, Some(&state), true, pos));
    }

    #[test]
    fn move_controls_follow_position() {
        let first = RosterPosition {
            is_first: true,
            is_last: false,
        };
        assert!(!device_action_enabled(DeviceAction::MoveUp, None, false, first));
        assert!(device_action_enabled(DeviceAction::MoveDown, None, false, first));
    }

    #[test]
    fn testloop_only_when_not_loaded() {
        let pos = RosterPosition::default();
        let state = device(ControllerState::Loaded);
        assert!(!device_action_enabled(DeviceAction::Testloop, Some(&state), true, pos));
        let state = device(ControllerState::NotLoaded);
        assert!(device_action_enabled(DeviceAction::Testloop, Some(&state), true, pos));
        assert!(!device_action_enabled(DeviceAction::Testloop, Some(&state), false, pos));
    }

    // ── Display ──

    #[test]
    fn status_text_scheduled() {
        let mut state = device(ControllerState::Scheduled);
        state.program = Some(program(vec![]));
        state.schedule = Some(Schedule {
            scheduled_time: "2024-05-01T21:00:00.000".into(),
        });
        assert_eq!(
            status_text(Some(&state)),
            "finale.json > 2024-05-01 21:00:00"
        );
    }

    #[test]
    fn status_text_neutral_when_inconsistent() {
        assert_eq!(status_text(Some(&device(ControllerState::Scheduled))), "");
        assert_eq!(status_text(None), "");
    }

    #[test]
    fn icons_and_colors() {
        assert_eq!(status_icon(ControllerState::Paused), "la-pause-circle");
        assert_eq!(status_color(ControllerState::Scheduled), "purple");
        assert_eq!(lock_icon(false), "la-lock-open");
        assert_eq!(lock_color(true), "red");
        assert_eq!(FuseStatus::Fired.icon(), "la-fire-alt");
        assert_eq!(FuseStatus::Fired.color(), "gray");
    }

    #[test]
    fn system_time_display() {
        assert_eq!(displayed_system_time("2024-05-01T10:11:12.345"), "10:11:12");
        assert_eq!(displayed_system_time(""), "--:--:--");
    }

    #[test]
    fn staleness_thresholds() {
        assert_eq!(Staleness::from_age(0), Staleness::Fresh);
        assert_eq!(Staleness::from_age(1), Staleness::Fresh);
        assert_eq!(Staleness::from_age(2), Staleness::Warning);
        assert_eq!(Staleness::from_age(5), Staleness::Warning);
        assert_eq!(Staleness::from_age(6), Staleness::Critical);
        assert_eq!(Staleness::Critical.color(), "red");
    }

    #[test]
    fn layout_helpers() {
        assert_eq!(chip_letters(3), vec!['a', 'b', 'c']);
        assert_eq!(chip_letters(0), Vec::<char>::new());
        let mut remote = device(ControllerState::NotLoaded);
        remote.is_remote = true;
        remote.fuse_amounts = vec![8, 8];
        assert_eq!(fuses_per_chip(&remote), 8);
        assert_eq!(fuses_per_chip(&device(ControllerState::NotLoaded)), 16);
    }
}
