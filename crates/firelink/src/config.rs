//! CLI configuration: thin wrapper around `firelink_config`.
//!
//! Re-exports the shared types and applies `GlobalOpts` overrides
//! (--master, --timeout, --enable, --yes, --output).

use firelink_core::{FleetConfig, SessionFlags};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use firelink_config::{Config, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub fleet: FleetConfig,
    pub session: SessionFlags,
    pub output: OutputFormat,
}

/// Apply flag overrides on top of the loaded config.
///
/// Flags win over environment, which wins over the file.
pub fn resolve(mut cfg: Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    if let Some(ref master) = global.master {
        cfg.master_url.clone_from(master);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout_ms = timeout;
    }

    let output = match global.output {
        Some(output) => output,
        None => parse_output(&cfg.output)?,
    };

    let session = SessionFlags {
        enabled: cfg.enabled || global.enable,
        ask_confirmation: cfg.ask_confirmation && !global.yes,
        ..SessionFlags::default()
    };

    Ok(Resolved {
        fleet: cfg.to_fleet_config()?,
        session,
        output,
    })
}

fn parse_output(value: &str) -> Result<OutputFormat, CliError> {
    match value {
        "table" => Ok(OutputFormat::Table),
        "json" => Ok(OutputFormat::Json),
        "plain" => Ok(OutputFormat::Plain),
        other => Err(CliError::Validation {
            field: "output".into(),
            reason: format!("expected 'table', 'json' or 'plain', got '{other}'"),
        }),
    }
}
