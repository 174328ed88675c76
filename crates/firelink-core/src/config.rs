// ── Runtime fleet configuration ──
//
// Describes where the master lives and how to reach devices. Never
// touches disk: the CLI builds a `FleetConfig` (via firelink-config) and
// hands it in.

use std::time::Duration;

use firelink_api::DEFAULT_TIMEOUT;
use url::Url;

use crate::error::CoreError;

/// Port every device serves its API on.
pub const DEFAULT_DEVICE_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Master base URL (e.g., `http://192.168.4.1:5000`).
    pub master_url: Url,
    pub device_port: u16,
    /// Bound on a single request/response exchange.
    pub timeout: Duration,
    /// Staleness tick period.
    pub tick_interval: Duration,
}

impl FleetConfig {
    pub fn new(master_url: Url) -> Self {
        Self {
            master_url,
            device_port: DEFAULT_DEVICE_PORT,
            timeout: DEFAULT_TIMEOUT,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Base URL of a device addressed from the fleet view: `http://{ip}:{port}`.
    pub fn device_host(&self, ip_address: &str) -> Result<Url, CoreError> {
        let raw = format!("http://{ip_address}:{}", self.device_port);
        Url::parse(&raw).map_err(|e| CoreError::Config {
            message: format!("invalid device address '{ip_address}': {e}"),
        })
    }
}
