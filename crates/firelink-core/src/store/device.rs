// ── Device state store ──
//
// One `DeviceView` per device event stream. Every message replaces the
// whole snapshot and resets the staleness counter; a one-second tick
// counts up between messages. Staleness only colours the display, it
// never takes the view out of `Live`.

use std::time::Duration;

use firelink_api::transport::join;
use firelink_api::{EVENT_STREAM_PATH, EventStreamHandle, RawDeviceState, Transport};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::roster::FleetRoster;
use crate::derive::Staleness;
use crate::error::CoreError;
use crate::model::DeviceState;
use crate::stream::StateStream;

/// Connection phase of one device view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
    /// No snapshot yet; render neutral defaults.
    #[default]
    Connecting,
    Live,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceView {
    pub link: LinkState,
    pub state: Option<DeviceState>,
    pub last_event_age_seconds: u64,
}

impl DeviceView {
    /// Apply one event payload. Unparsable payloads leave the view untouched.
    pub fn apply(&mut self, payload: &str) -> Option<&DeviceState> {
        let raw: RawDeviceState = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "ignoring unparsable device event");
                return None;
            }
        };
        self.apply_state(DeviceState::from(raw));
        self.state.as_ref()
    }

    pub fn apply_state(&mut self, state: DeviceState) {
        self.state = Some(state);
        self.last_event_age_seconds = 0;
        self.link = LinkState::Live;
    }

    pub fn tick(&mut self) {
        self.last_event_age_seconds = self.last_event_age_seconds.saturating_add(1);
    }

    pub fn staleness(&self) -> Staleness {
        Staleness::from_age(self.last_event_age_seconds)
    }

    pub fn device_id(&self) -> Option<&str> {
        self.state
            .as_ref()
            .map(|s| s.device_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

// ── DeviceMonitor ────────────────────────────────────────────────────

/// Live subscription to one device: event stream plus staleness tick.
///
/// Both are driven by one task under one token, so they stop together.
/// Stopping is idempotent and also happens on drop.
pub struct DeviceMonitor {
    host: Url,
    view: watch::Receiver<DeviceView>,
    cancel: CancellationToken,
}

impl DeviceMonitor {
    /// Subscribe to `{host}/event-stream`.
    ///
    /// With a `roster`, every applied snapshot is also stored there.
    pub fn start(
        transport: &Transport,
        host: Url,
        tick_interval: Duration,
        roster: Option<FleetRoster>,
        parent: &CancellationToken,
    ) -> Result<Self, CoreError> {
        let url = join(&host, EVENT_STREAM_PATH)?;
        let cancel = parent.child_token();
        let stream = EventStreamHandle::connect(transport.http().clone(), url, cancel.child_token());
        Ok(Self::with_stream(host, stream, tick_interval, roster, cancel))
    }

    /// Drive an already open event stream.
    ///
    /// Cancelling `cancel` stops the tick and drops `stream` in the same step.
    pub fn with_stream(
        host: Url,
        stream: EventStreamHandle,
        tick_interval: Duration,
        roster: Option<FleetRoster>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(DeviceView::default());

        debug!(%host, "device monitor started");
        tokio::spawn(monitor_task(stream, tx, tick_interval, roster, cancel.clone()));

        Self {
            host,
            view: rx,
            cancel,
        }
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn view(&self) -> DeviceView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<DeviceView> {
        StateStream::new(self.view.clone())
    }

    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            debug!(host = %self.host, "device monitor stopped");
            self.cancel.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for DeviceMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn monitor_task(
    mut stream: EventStreamHandle,
    view: watch::Sender<DeviceView>,
    tick_interval: Duration,
    roster: Option<FleetRoster>,
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
                let mut applied = None;
                view.send_if_modified(|v| {
                    applied = v.apply(&message.data).cloned();
                    applied.is_some()
                });
                if let (Some(state), Some(roster)) = (applied, roster.as_ref()) {
                    roster.update_device(state);
                }
            }
            _ = ticker.tick() => view.send_modify(DeviceView::tick),
        }
    }

    stream.shutdown();
}
