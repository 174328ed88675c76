//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use firelink_config::ConfigError;
use firelink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach {url}")]
    #[diagnostic(
        code(firelink::connection_failed),
        help(
            "Check that the master is powered and on the same network.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(firelink::timeout),
        help("Increase the bound with --timeout or check the device.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Commands ─────────────────────────────────────────────────────

    #[error("Command failed: {message}")]
    #[diagnostic(
        code(firelink::command_failed),
        help("The device reported an error or could not be reached. Run with -v for details.")
    )]
    CommandFailed { message: String },

    #[error("Request rejected (HTTP {status}): {message}")]
    #[diagnostic(code(firelink::rejected))]
    Rejected { status: u16, message: String },

    #[error("'{action}' is not available right now")]
    #[diagnostic(code(firelink::disabled), help("{reason}"))]
    Disabled { action: String, reason: String },

    #[error("'{action}' was not confirmed")]
    #[diagnostic(
        code(firelink::cancelled),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    Cancelled { action: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Device '{device_id}' not found")]
    #[diagnostic(
        code(firelink::not_found),
        help("Run: firelink devices, or firelink search to discover devices")
    )]
    NotFound { device_id: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(firelink::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(firelink::malformed_input),
        help("Program files must contain valid JSON.")
    )]
    MalformedInput { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(firelink::config))]
    Config(Box<figment::Error>),

    #[error("{message}")]
    #[diagnostic(code(firelink::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Disabled { .. } | Self::Validation { .. } | Self::MalformedInput { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },

            CoreError::Network { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Http { status, message } => CliError::Rejected { status, message },

            CoreError::MalformedInput { message } => CliError::MalformedInput { message },

            CoreError::DeviceNotFound { device_id } => CliError::NotFound { device_id },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Io { path, source } => {
                CliError::Io(std::io::Error::new(source.kind(), format!("{path}: {source}")))
            }

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Io(err) => CliError::Io(err),
            ConfigError::Serialization(err) => CliError::Internal {
                message: format!("failed to serialize config: {err}"),
            },
        }
    }
}
