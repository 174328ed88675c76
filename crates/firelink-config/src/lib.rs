//! Shared configuration for the firelink tools.
//!
//! A flat TOML file layered under `FIRELINK_*` environment variables, and
//! translation to `firelink_core::FleetConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use firelink_core::{DEFAULT_DEVICE_PORT, FleetConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Master base URL (e.g., "http://192.168.4.1:5000").
    pub master_url: String,

    /// Port every device serves its API on.
    pub device_port: u16,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Prompt before sending commands.
    pub ask_confirmation: bool,

    /// Start with controls enabled (the page's "enabled" toggle).
    pub enabled: bool,

    /// Default output format: "table", "json" or "plain".
    pub output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_url: "http://localhost:5000".into(),
            device_port: DEFAULT_DEVICE_PORT,
            timeout_ms: 100_000,
            ask_confirmation: true,
            enabled: false,
            output: "table".into(),
        }
    }
}

impl Config {
    /// Build the core's runtime config, validating the master URL.
    pub fn to_fleet_config(&self) -> Result<FleetConfig, ConfigError> {
        let master_url: url::Url =
            self.master_url
                .parse()
                .map_err(|e: url::ParseError| ConfigError::Validation {
                    field: "master_url".into(),
                    reason: format!("invalid URL '{}': {e}", self.master_url),
                })?;
        if !matches!(master_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "master_url".into(),
                reason: format!("unsupported scheme '{}'", master_url.scheme()),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let mut fleet = FleetConfig::new(master_url);
        fleet.device_port = self.device_port;
        fleet.timeout = Duration::from_millis(self.timeout_ms);
        Ok(fleet)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "firelink", "firelink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("firelink");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if it exists), then `FIRELINK_*` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FIRELINK_"));

    Ok(figment.extract()?)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.device_port, 5000);
        assert_eq!(cfg.timeout_ms, 100_000);
        assert!(cfg.ask_confirmation);
        assert!(!cfg.enabled);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "master_url = \"http://10.0.0.1:5000\"\nask_confirmation = false\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.master_url, "http://10.0.0.1:5000");
        assert!(!cfg.ask_confirmation);
        assert_eq!(cfg.output, "table");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            master_url: "http://192.168.4.1:5000".into(),
            device_port: 5001,
            enabled: true,
            ..Config::default()
        };
        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn fleet_config_carries_port_and_timeout() {
        let cfg = Config {
            device_port: 6000,
            timeout_ms: 2500,
            ..Config::default()
        };
        let fleet = cfg.to_fleet_config().unwrap();
        assert_eq!(fleet.device_port, 6000);
        assert_eq!(fleet.timeout, Duration::from_millis(2500));
        assert_eq!(fleet.master_url.as_str(), "http://localhost:5000/");
    }

    #[test]
    fn bad_master_url_is_a_validation_error() {
        let cfg = Config {
            master_url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            cfg.to_fleet_config(),
            Err(ConfigError::Validation { field, .. }) if field == "master_url"
        ));

        let cfg = Config {
            master_url: "ftp://host".into(),
            ..Config::default()
        };
        assert!(cfg.to_fleet_config().is_err());
    }
}
