// ── Command gateway ──
//
// Confirm → pending → send → success|failure, for every operator action.
// Transport errors stop here: callers get `None`, the key's status flips
// to `Failure` and the session's error banner is raised.

use std::fmt;
use std::sync::Arc;

use firelink_api::{ApiRequest, Transport};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use strum::{Display, IntoStaticStr};
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::command::Command;
use crate::session::Session;

// ── CommandStatus ────────────────────────────────────────────────────

/// Outcome of the most recent submission for one key.
///
/// Sticky: only a new submission of the same key changes it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Failure,
}

impl CommandStatus {
    /// Class name the view layer attaches to the control.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Pending => "status-pending",
            Self::Success => "status-success",
            Self::Failure => "status-failure",
        }
    }
}

// ── CommandKey ───────────────────────────────────────────────────────

/// Status-board key: `name`, or `name:device_id` for per-device controls
/// on the fleet view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommandKey(String);

impl CommandKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn for_device(name: impl AsRef<str>, device_id: &str) -> Self {
        Self(format!("{}:{device_id}", name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to `device_id`'s per-device controls.
    pub fn is_for_device(&self, device_id: &str) -> bool {
        self.0
            .split_once(':')
            .is_some_and(|(_, id)| id == device_id)
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── StatusBoard ──────────────────────────────────────────────────────

/// Observable map of command key → status. Clones share the same board.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<watch::Sender<IndexMap<CommandKey, CommandStatus>>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(IndexMap::new());
        Self { inner: Arc::new(tx) }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status; unknown keys read as `Idle`.
    pub fn get(&self, key: &CommandKey) -> CommandStatus {
        self.inner.borrow().get(key).copied().unwrap_or_default()
    }

    pub fn set(&self, key: &CommandKey, status: CommandStatus) {
        self.inner.send_modify(|map| {
            map.insert(key.clone(), status);
        });
    }

    /// Insert `Idle` for `key` unless it is already tracked.
    pub fn seed(&self, key: &CommandKey) {
        self.inner.send_if_modified(|map| {
            if map.contains_key(key) {
                return false;
            }
            map.insert(key.clone(), CommandStatus::Idle);
            true
        });
    }

    /// Forget every per-device key belonging to `device_id`.
    pub fn drop_device(&self, device_id: &str) {
        self.inner.send_if_modified(|map| {
            let before = map.len();
            map.retain(|key, _| !key.is_for_device(device_id));
            map.len() != before
        });
    }

    pub fn contains(&self, key: &CommandKey) -> bool {
        self.inner.borrow().contains_key(key)
    }

    pub fn snapshot(&self) -> IndexMap<CommandKey, CommandStatus> {
        self.inner.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndexMap<CommandKey, CommandStatus>> {
        self.inner.subscribe()
    }
}

// ── Confirmation ─────────────────────────────────────────────────────

/// Operator confirmation prompt.
pub trait Confirm: Send + Sync {
    /// Return `true` to go ahead with the command.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Accepts every prompt. For scripted, non-interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

// ── CommandGateway ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct CommandGateway {
    transport: Transport,
    statuses: StatusBoard,
    session: Session,
    confirm: Arc<dyn Confirm>,
}

impl CommandGateway {
    pub fn new(transport: Transport, session: Session, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            transport,
            statuses: StatusBoard::new(),
            session,
            confirm,
        }
    }

    pub fn statuses(&self) -> &StatusBoard {
        &self.statuses
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Run one request under `key`.
    ///
    /// A declined prompt returns `None` without touching the status board.
    /// Otherwise the key goes `Pending` before any I/O and settles on the
    /// response. Failures resolve to `None` and raise the session banner.
    pub async fn execute(
        &self,
        key: &CommandKey,
        base: &Url,
        request: &ApiRequest,
        prompt: &str,
        ask: bool,
    ) -> Option<Value> {
        if ask && !self.confirm.confirm(prompt) {
            debug!(%key, "command declined by operator");
            return None;
        }

        self.statuses.set(key, CommandStatus::Pending);

        match self.transport.send(base, request).await {
            Ok(value) => {
                self.statuses.set(key, CommandStatus::Success);
                debug!(%key, status = %CommandStatus::Success, "command completed");
                Some(value)
            }
            Err(e) => {
                self.statuses.set(key, CommandStatus::Failure);
                warn!(%key, error = %e, "command failed");
                self.session.notify_error(format!("{key}: {e}"));
                None
            }
        }
    }

    /// Send `command` to `base`, keyed per device when `device_id` is given.
    pub async fn send(
        &self,
        command: &Command,
        base: &Url,
        device_id: Option<&str>,
    ) -> Option<Value> {
        let key = match device_id {
            Some(id) => CommandKey::for_device(command.key_name(), id),
            None => CommandKey::new(command.key_name()),
        };
        let ask = command.always_confirms() || self.session.ask_confirmation();
        self.execute(&key, base, &command.request(), &command.prompt(), ask)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_classes() {
        assert_eq!(CommandStatus::Idle.css_class(), "");
        assert_eq!(CommandStatus::Pending.css_class(), "status-pending");
        assert_eq!(CommandStatus::Success.css_class(), "status-success");
        assert_eq!(CommandStatus::Failure.css_class(), "status-failure");
    }

    #[test]
    fn device_keys() {
        let key = CommandKey::for_device("deregister", "dev1");
        assert_eq!(key.as_str(), "deregister:dev1");
        assert!(key.is_for_device("dev1"));
        assert!(!key.is_for_device("dev10"));
        assert!(!CommandKey::new("search").is_for_device("search"));
    }

    #[test]
    fn seed_keeps_existing_status() {
        let board = StatusBoard::new();
        let key = CommandKey::for_device("deregister", "dev1");
        board.set(&key, CommandStatus::Failure);
        board.seed(&key);
        assert_eq!(board.get(&key), CommandStatus::Failure);

        let fresh = CommandKey::for_device("deregister", "dev2");
        board.seed(&fresh);
        assert!(board.contains(&fresh));
        assert_eq!(board.get(&fresh), CommandStatus::Idle);
    }

    #[test]
    fn drop_device_only_removes_that_device() {
        let board = StatusBoard::new();
        board.seed(&CommandKey::for_device("deregister", "dev1"));
        board.seed(&CommandKey::for_device("lock", "dev1"));
        board.seed(&CommandKey::for_device("deregister", "dev2"));
        board.seed(&CommandKey::new("search"));

        board.drop_device("dev1");

        let keys: Vec<String> = board.snapshot().keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["deregister:dev2", "search"]);
    }

    #[test]
    fn unknown_key_reads_idle() {
        assert_eq!(
            StatusBoard::new().get(&CommandKey::new("play")),
            CommandStatus::Idle
        );
    }
}
