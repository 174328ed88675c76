// ── Fleet facade ──
//
// Owns the session, gateway, roster and the background subscriptions of
// the fleet view. Every operator intent goes through here; results come
// back as `Option` (gateway semantics) or `CoreError` for the paths that
// fail before any command is sent.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::NaiveTime;
use firelink_api::models::decode_device_map;
use firelink_api::transport::join;
use firelink_api::{
    DeregisterResponse, EVENT_STREAM_PATH, EventStreamHandle, RawHeartbeat, Transport,
    TransportConfig, requests,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::command::Command;
use crate::config::FleetConfig;
use crate::convert::devices_from_raw;
use crate::derive::{self, DeviceAction, FleetAction, Staleness};
use crate::error::CoreError;
use crate::gateway::{CommandGateway, CommandKey, Confirm, StatusBoard};
use crate::model::{DeviceState, FleetHeartbeat};
use crate::program::ProgramUpload;
use crate::schedule::schedule_time_for;
use crate::session::Session;
use crate::store::{DeviceMonitor, DeviceView, Direction, FleetRoster};
use crate::stream::StateStream;

// ── MasterView ───────────────────────────────────────────────────────

/// Master clock as last reported by the fleet heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasterView {
    pub system_time: String,
    pub last_event_age_seconds: u64,
}

impl MasterView {
    pub fn staleness(&self) -> Staleness {
        Staleness::from_age(self.last_event_age_seconds)
    }

    pub fn displayed_time(&self) -> String {
        derive::displayed_system_time(&self.system_time)
    }
}

// ── Fleet ────────────────────────────────────────────────────────────

/// Fleet dashboard core. Cheaply cloneable; clones share all state.
#[derive(Clone)]
pub struct Fleet {
    inner: Arc<FleetInner>,
}

struct FleetInner {
    config: FleetConfig,
    gateway: CommandGateway,
    roster: FleetRoster,
    master: watch::Sender<MasterView>,
    cancel: CancellationToken,
    monitors: Mutex<HashMap<String, DeviceMonitor>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for FleetInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Clears the roster's `searching` flag however the search ends.
struct SearchGuard<'a>(&'a FleetRoster);

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.0.set_searching(false);
    }
}

impl Fleet {
    pub fn new(
        config: FleetConfig,
        session: Session,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, CoreError> {
        let transport = Transport::new(&TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        })?;
        Ok(Self::with_transport(config, transport, session, confirm))
    }

    /// Build around an existing transport (tests, custom HTTP clients).
    pub fn with_transport(
        config: FleetConfig,
        transport: Transport,
        session: Session,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let (master, _rx) = watch::channel(MasterView::default());
        Self {
            inner: Arc::new(FleetInner {
                config,
                gateway: CommandGateway::new(transport, session, confirm),
                roster: FleetRoster::new(),
                master,
                cancel: CancellationToken::new(),
                monitors: Mutex::new(HashMap::new()),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &FleetConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Session {
        self.inner.gateway.session()
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.inner.gateway
    }

    pub fn roster(&self) -> &FleetRoster {
        &self.inner.roster
    }

    pub fn statuses(&self) -> &StatusBoard {
        self.inner.gateway.statuses()
    }

    pub fn master_view(&self) -> StateStream<MasterView> {
        StateStream::new(self.inner.master.subscribe())
    }

    fn master_url(&self) -> &Url {
        &self.inner.config.master_url
    }

    // ── Roster ───────────────────────────────────────────────────────

    /// Initial `GET /devices`. Not an operator command: no prompt, no
    /// status key; a failure only raises the banner.
    pub async fn load_devices(&self) -> Result<usize, CoreError> {
        let transport = self.inner.gateway.transport();
        let value = match transport
            .send(self.master_url(), &requests::list_devices())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "initial device listing failed");
                self.session().notify_error(format!("devices: {e}"));
                return Err(e.into());
            }
        };
        let devices = self.decode_devices(&value)?;
        let count = devices.len();
        self.seed_deregister_keys(devices.iter().map(|(id, _)| id.as_str()));
        self.roster().replace(devices);
        Ok(count)
    }

    /// Discover devices and replace the roster with the result.
    ///
    /// Heartbeat pruning is suspended while the request is in flight.
    /// Returns the discovered ids, or `None` when declined or failed.
    pub async fn search(&self) -> Option<Vec<String>> {
        let roster = self.roster();
        roster.set_searching(true);
        let _guard = SearchGuard(roster);

        let value = self
            .gateway()
            .send(&Command::Search, self.master_url(), None)
            .await?;

        let devices = match self.decode_devices(&value) {
            Ok(devices) => devices,
            Err(e) => {
                self.session().notify_error(format!("search: {e}"));
                return None;
            }
        };
        let ids: Vec<String> = devices.iter().map(|(id, _)| id.clone()).collect();
        self.stop_monitors_except(&ids).await;
        for gone in roster.ids().into_iter().filter(|id| !ids.contains(id)) {
            self.statuses().drop_device(&gone);
        }
        self.seed_deregister_keys(ids.iter().map(String::as_str));
        roster.replace(devices);
        info!(count = ids.len(), "search completed");
        Some(ids)
    }

    /// Deregister one device. Returns the id the master reports as removed.
    pub async fn deregister(&self, device_id: &str) -> Option<String> {
        let command = Command::Deregister {
            device_id: device_id.to_owned(),
        };
        let value = self
            .gateway()
            .send(&command, self.master_url(), Some(device_id))
            .await?;

        let removed = serde_json::from_value::<DeregisterResponse>(value)
            .map_or_else(|_| device_id.to_owned(), |r| r.deregistered_device_id);
        self.forget_device(&removed).await;
        Some(removed)
    }

    pub async fn deregister_all(&self) -> bool {
        if self
            .gateway()
            .send(&Command::DeregisterAll, self.master_url(), None)
            .await
            .is_none()
        {
            return false;
        }
        self.stop_monitors_except(&[]).await;
        for id in self.roster().ids() {
            self.statuses().drop_device(&id);
        }
        self.roster().clear();
        true
    }

    pub fn reorder(&self, device_id: &str, direction: Direction) -> bool {
        self.roster().reorder(device_id, direction)
    }

    /// Record the master clock and prune devices the master no longer lists.
    pub async fn apply_heartbeat(&self, heartbeat: FleetHeartbeat) -> Vec<String> {
        self.inner.master.send_modify(|view| {
            view.system_time = heartbeat.system_time;
            view.last_event_age_seconds = 0;
        });

        let Some(present) = heartbeat.device_ids else {
            return Vec::new();
        };
        let roster = self.roster();
        if roster.searching() {
            return Vec::new();
        }
        for absent in roster.ids().iter().filter(|id| !present.contains(*id)) {
            self.stop_monitor(absent).await;
        }
        let removed = roster.prune_absent(&present);
        for id in &removed {
            self.statuses().drop_device(id);
        }
        removed
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn fleet_action_enabled(&self, action: FleetAction) -> bool {
        let snapshot = self.roster().snapshot();
        derive::fleet_action_enabled(action, snapshot.devices.values(), self.session().enabled())
    }

    pub fn device_action_enabled(&self, device_id: &str, action: DeviceAction) -> bool {
        let snapshot = self.roster().snapshot();
        let Some(position) = snapshot.position(device_id) else {
            return false;
        };
        derive::device_action_enabled(
            action,
            snapshot.devices.get(device_id),
            self.session().enabled(),
            position,
        )
    }

    /// Fleet-wide action sent to the master.
    ///
    /// `Load` and `Schedule` need input: use [`upload_program`](Self::upload_program)
    /// and [`schedule_at`](Self::schedule_at).
    pub async fn run_fleet(&self, action: FleetAction) -> Result<Option<Value>, CoreError> {
        let command = match action {
            FleetAction::Unload => Command::Unload,
            FleetAction::Play => Command::Play,
            FleetAction::Pause => Command::Pause,
            FleetAction::Continue => Command::Continue,
            FleetAction::Stop => Command::Stop,
            FleetAction::Testloop => Command::Testloop,
            FleetAction::Unschedule => Command::Unschedule,
            FleetAction::Unlock => Command::Unlock,
            FleetAction::Lock => Command::Lock,
            FleetAction::DeregisterAll => {
                return Ok(self.deregister_all().await.then_some(Value::Null));
            }
            FleetAction::Load | FleetAction::Schedule => {
                return Err(CoreError::MalformedInput {
                    message: format!("'{action}' needs a program file or a time"),
                });
            }
        };
        Ok(self.gateway().send(&command, self.master_url(), None).await)
    }

    /// Per-device action, sent to the device's own host.
    pub async fn run_device(
        &self,
        device_id: &str,
        action: DeviceAction,
    ) -> Result<Option<Value>, CoreError> {
        let command = match action {
            DeviceAction::Shutdown => Command::Shutdown,
            DeviceAction::Reboot => Command::Reboot,
            DeviceAction::Testloop => Command::Testloop,
            DeviceAction::Lock => Command::Lock,
            DeviceAction::Unlock => Command::Unlock,
            DeviceAction::Update => Command::Update,
            DeviceAction::Deregister => {
                return Ok(self.deregister(device_id).await.map(Value::String));
            }
            DeviceAction::MoveUp | DeviceAction::MoveDown => {
                let direction = if action == DeviceAction::MoveUp {
                    Direction::Up
                } else {
                    Direction::Down
                };
                self.require_device(device_id)?;
                return Ok(self
                    .reorder(device_id, direction)
                    .then(|| Value::from(self.roster().ids())));
            }
            DeviceAction::Fire => {
                return Err(CoreError::MalformedInput {
                    message: "fire needs a channel, e.g. a3".into(),
                });
            }
        };
        let host = self.device_host(device_id)?;
        Ok(self.gateway().send(&command, &host, Some(device_id)).await)
    }

    /// Fire one channel of one device.
    pub async fn fire(
        &self,
        device_id: &str,
        letter: char,
        number: u32,
    ) -> Result<Option<Value>, CoreError> {
        let host = self.device_host(device_id)?;
        let command = Command::Fire {
            device_id: device_id.to_owned(),
            letter: letter.to_ascii_lowercase(),
            number,
        };
        Ok(self.gateway().send(&command, &host, Some(device_id)).await)
    }

    /// Parse and upload a program. A broken file fails before any request.
    pub async fn upload_program(
        &self,
        file_name: &str,
        contents: &str,
    ) -> Result<Option<Value>, CoreError> {
        let upload = ProgramUpload::from_file_contents(file_name, contents)?;
        Ok(self.send_upload(upload).await)
    }

    pub async fn upload_program_file(
        &self,
        path: &std::path::Path,
    ) -> Result<Option<Value>, CoreError> {
        let upload = ProgramUpload::read(path)?;
        Ok(self.send_upload(upload).await)
    }

    async fn send_upload(&self, upload: ProgramUpload) -> Option<Value> {
        self.gateway()
            .send(&upload.into_command(), self.master_url(), None)
            .await
    }

    /// Schedule the loaded program for the next `time_of_day`.
    ///
    /// Always asks for confirmation. Returns the scheduled instant on success.
    pub async fn schedule_at(&self, time_of_day: NaiveTime) -> Option<String> {
        let clock = self.inner.master.borrow().system_time.clone();
        let clock = Some(clock.as_str()).filter(|c| !c.is_empty());
        let time = schedule_time_for(time_of_day, clock);
        let command = Command::Schedule { time: time.clone() };
        self.gateway()
            .send(&command, self.master_url(), None)
            .await
            .map(|_| time)
    }

    // ── Live subscriptions ───────────────────────────────────────────

    /// Consume the master's heartbeat stream in the background.
    pub async fn watch_heartbeat(&self) -> Result<(), CoreError> {
        let url = join(self.master_url(), EVENT_STREAM_PATH)?;
        let cancel = self.inner.cancel.child_token();
        let stream = EventStreamHandle::connect(
            self.gateway().transport().http().clone(),
            url,
            cancel.child_token(),
        );
        let handle = tokio::spawn(heartbeat_task(
            Arc::downgrade(&self.inner),
            self.inner.config.tick_interval,
            stream,
            cancel,
        ));
        self.inner.task_handles.lock().await.push(handle);
        Ok(())
    }

    /// Start a monitor for every rostered device that has none yet.
    ///
    /// Returns how many were started.
    pub async fn watch_devices(&self) -> Result<usize, CoreError> {
        let mut started = 0;
        for id in self.roster().ids() {
            if self.inner.monitors.lock().await.contains_key(&id) {
                continue;
            }
            self.watch_device(&id).await?;
            started += 1;
        }
        Ok(started)
    }

    /// Live view of one device, starting its monitor if needed.
    pub async fn watch_device(&self, device_id: &str) -> Result<StateStream<DeviceView>, CoreError> {
        let mut monitors = self.inner.monitors.lock().await;
        if let Some(monitor) = monitors.get(device_id) {
            return Ok(monitor.subscribe());
        }
        let host = self.device_host(device_id)?;
        let monitor = DeviceMonitor::start(
            self.gateway().transport(),
            host,
            self.inner.config.tick_interval,
            Some(self.roster().clone()),
            &self.inner.cancel,
        )?;
        let stream = monitor.subscribe();
        monitors.insert(device_id.to_owned(), monitor);
        Ok(stream)
    }

    /// Stop every subscription and wait for background tasks.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop_monitors_except(&[]).await;

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("fleet shut down");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn decode_devices(&self, value: &Value) -> Result<Vec<(String, DeviceState)>, CoreError> {
        let raw = decode_device_map(value).map_err(|e| {
            CoreError::Internal(format!("unexpected device listing from master: {e}"))
        })?;
        let devices = devices_from_raw(raw);
        debug!(count = devices.len(), master = %self.master_url(), "decoded device listing");
        Ok(devices)
    }

    fn seed_deregister_keys<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.statuses()
                .seed(&CommandKey::for_device(Command::DEREGISTER_KEY, id));
        }
    }

    fn require_device(&self, device_id: &str) -> Result<DeviceState, CoreError> {
        self.roster()
            .get(device_id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                device_id: device_id.to_owned(),
            })
    }

    fn device_host(&self, device_id: &str) -> Result<Url, CoreError> {
        let device = self.require_device(device_id)?;
        let ip = device.ip_address.ok_or_else(|| CoreError::Config {
            message: format!("no network address known for {device_id}; run a search first"),
        })?;
        self.inner.config.device_host(&ip)
    }

    async fn forget_device(&self, device_id: &str) {
        self.stop_monitor(device_id).await;
        self.roster().remove(device_id);
        self.statuses().drop_device(device_id);
    }

    async fn stop_monitor(&self, device_id: &str) {
        if let Some(monitor) = self.inner.monitors.lock().await.remove(device_id) {
            monitor.shutdown();
        }
    }

    async fn stop_monitors_except(&self, keep: &[String]) {
        let mut monitors = self.inner.monitors.lock().await;
        monitors.retain(|id, monitor| {
            let keep = keep.contains(id);
            if !keep {
                monitor.shutdown();
            }
            keep
        });
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Holds the fleet weakly: dropping the last `Fleet` cancels the task.
async fn heartbeat_task(
    fleet: Weak<FleetInner>,
    tick_interval: Duration,
    mut stream: EventStreamHandle,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = stream.recv() => {
                let Some(message) = message else { break };
                let Some(inner) = fleet.upgrade() else { break };
                match serde_json::from_str::<RawHeartbeat>(&message.data) {
                    Ok(raw) => {
                        Fleet { inner }.apply_heartbeat(raw.into()).await;
                    }
                    Err(e) => warn!(error = %e, "ignoring unparsable heartbeat"),
                }
            }
            _ = ticker.tick() => {
                let Some(inner) = fleet.upgrade() else { break };
                inner.master.send_modify(|view| {
                    view.last_event_age_seconds = view.last_event_age_seconds.saturating_add(1);
                });
            }
        }
    }

    stream.shutdown();
}
