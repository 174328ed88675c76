// ── Fleet roster ──
//
// Ordered device collection for the fleet view. Order and membership live
// in one `IndexMap`, so every mutation keeps them in step. Mutations are
// applied through `watch::Sender::send_modify` and are visible to
// subscribers as whole snapshots.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::derive::RosterPosition;
use crate::model::DeviceState;

/// Manual reorder direction. `Up` moves towards index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Immutable view of the roster at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RosterSnapshot {
    pub devices: IndexMap<String, DeviceState>,
    /// A search is in flight; heartbeat pruning is suspended.
    pub searching: bool,
}

impl RosterSnapshot {
    pub fn ids(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    pub fn position(&self, device_id: &str) -> Option<RosterPosition> {
        let index = self.devices.get_index_of(device_id)?;
        Some(RosterPosition {
            is_first: index == 0,
            is_last: index + 1 == self.devices.len(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FleetRoster {
    inner: Arc<watch::Sender<RosterSnapshot>>,
}

impl Default for FleetRoster {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(RosterSnapshot::default());
        Self { inner: Arc::new(tx) }
    }
}

impl FleetRoster {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> RosterSnapshot {
        self.inner.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.inner.subscribe()
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.borrow().ids()
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceState> {
        self.inner.borrow().devices.get(device_id).cloned()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.inner.borrow().devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().devices.is_empty()
    }

    pub fn is_first(&self, device_id: &str) -> bool {
        self.position(device_id).is_some_and(|p| p.is_first)
    }

    pub fn is_last(&self, device_id: &str) -> bool {
        self.position(device_id).is_some_and(|p| p.is_last)
    }

    pub fn position(&self, device_id: &str) -> Option<RosterPosition> {
        self.inner.borrow().position(device_id)
    }

    pub fn searching(&self) -> bool {
        self.inner.borrow().searching
    }

    // ── Membership ───────────────────────────────────────────────────

    /// Replace membership and order wholesale.
    pub fn replace(&self, devices: impl IntoIterator<Item = (String, DeviceState)>) {
        let devices: IndexMap<String, DeviceState> = devices.into_iter().collect();
        info!(count = devices.len(), "roster replaced");
        self.inner.send_modify(|snap| snap.devices = devices);
    }

    /// Store a fresh snapshot for a device already on the roster.
    ///
    /// Membership only changes through `replace`, `remove` and pruning, so a
    /// snapshot for an unknown id is dropped. Device streams do not carry the
    /// network address, so the known one is kept. Returns whether it was stored.
    pub fn update_device(&self, mut state: DeviceState) -> bool {
        if state.device_id.is_empty() {
            warn!("ignoring device snapshot without a device id");
            return false;
        }
        self.inner.send_if_modified(|snap| {
            let Some(existing) = snap.devices.get_mut(&state.device_id) else {
                debug!(device_id = %state.device_id, "dropping snapshot for device not on the roster");
                return false;
            };
            if state.ip_address.is_none() {
                state.ip_address = existing.ip_address.take();
            }
            *existing = state;
            true
        })
    }

    pub fn remove(&self, device_id: &str) -> bool {
        let removed = self
            .inner
            .send_if_modified(|snap| snap.devices.shift_remove(device_id).is_some());
        if removed {
            info!(%device_id, "device removed from roster");
        }
        removed
    }

    pub fn clear(&self) {
        self.inner.send_if_modified(|snap| {
            let changed = !snap.devices.is_empty();
            snap.devices.clear();
            changed
        });
    }

    /// Swap `device_id` with its neighbour. No-op at the boundaries.
    pub fn reorder(&self, device_id: &str, direction: Direction) -> bool {
        self.inner.send_if_modified(|snap| {
            let Some(index) = snap.devices.get_index_of(device_id) else {
                return false;
            };
            let target = match direction {
                Direction::Up => index.checked_sub(1),
                Direction::Down => Some(index + 1).filter(|t| *t < snap.devices.len()),
            };
            let Some(target) = target else {
                return false;
            };
            snap.devices.swap_indices(index, target);
            true
        })
    }

    // ── Search / heartbeat reconciliation ────────────────────────────

    pub fn set_searching(&self, searching: bool) {
        self.inner.send_if_modified(|snap| {
            let changed = snap.searching != searching;
            snap.searching = searching;
            changed
        });
    }

    /// Drop every device not in `present`. Skipped while a search is in flight.
    ///
    /// Returns the removed ids.
    pub fn prune_absent(&self, present: &[String]) -> Vec<String> {
        let mut removed = Vec::new();
        self.inner.send_if_modified(|snap| {
            if snap.searching {
                return false;
            }
            snap.devices.retain(|id, _| {
                let keep = present.contains(id);
                if !keep {
                    removed.push(id.clone());
                }
                keep
            });
            !removed.is_empty()
        });
        if !removed.is_empty() {
            info!(removed = ?removed, "pruned devices no longer registered");
        }
        removed
    }
}
