// ── Per-view session state ──
//
// Operator toggles and the error banner, held in one observable value.
// Cloning a `Session` shares the same state.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of the session toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFlags {
    /// Master switch for every control.
    pub enabled: bool,
    /// Ask the operator before sending a command.
    pub ask_confirmation: bool,
    /// Banner raised by any failed command until dismissed.
    pub error_occurred: bool,
    /// Description of the most recent failure, if any.
    pub last_error: Option<String>,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            enabled: false,
            ask_confirmation: true,
            error_occurred: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    flags: Arc<watch::Sender<SessionFlags>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionFlags::default())
    }
}

impl Session {
    pub fn new(flags: SessionFlags) -> Self {
        let (tx, _rx) = watch::channel(flags);
        Self { flags: Arc::new(tx) }
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionFlags> {
        self.flags.subscribe()
    }

    // ── Enabled ──────────────────────────────────────────────────────

    pub fn enabled(&self) -> bool {
        self.flags.borrow().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.send_if_modified(|f| replace(&mut f.enabled, enabled));
    }

    pub fn toggle_enabled(&self) -> bool {
        self.flags.send_modify(|f| f.enabled = !f.enabled);
        self.enabled()
    }

    // ── Confirmation ─────────────────────────────────────────────────

    pub fn ask_confirmation(&self) -> bool {
        self.flags.borrow().ask_confirmation
    }

    pub fn set_ask_confirmation(&self, ask: bool) {
        self.flags
            .send_if_modified(|f| replace(&mut f.ask_confirmation, ask));
    }

    pub fn toggle_ask_confirmation(&self) -> bool {
        self.flags
            .send_modify(|f| f.ask_confirmation = !f.ask_confirmation);
        self.ask_confirmation()
    }

    // ── Error banner ─────────────────────────────────────────────────

    pub fn error_occurred(&self) -> bool {
        self.flags.borrow().error_occurred
    }

    pub fn last_error(&self) -> Option<String> {
        self.flags.borrow().last_error.clone()
    }

    /// Raise the banner. Called by the gateway on every failed command.
    pub fn notify_error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "error banner raised");
        self.flags.send_modify(|f| {
            f.error_occurred = true;
            f.last_error = Some(message);
        });
    }

    pub fn dismiss_error(&self) {
        self.flags.send_if_modified(|f| {
            let changed = f.error_occurred || f.last_error.is_some();
            f.error_occurred = false;
            f.last_error = None;
            changed
        });
    }
}

/// Assign and report whether the value changed.
fn replace(slot: &mut bool, value: bool) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}
