// ── Core error types ──
//
// Errors surfaced by firelink-core outside the command gateway. Gateway
// callers never see these: a failed command resolves to `None` plus a
// status flip. The `From<firelink_api::Error>` impl folds transport
// failures into domain-level variants for the remaining paths (initial
// roster load, program files, URL building).

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport ────────────────────────────────────────────────────
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Cannot reach {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Device rejected the request (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── Data ─────────────────────────────────────────────────────────
    /// Operator-supplied input that cannot be used, e.g. an unparsable program file.
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    // ── Environment ──────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<firelink_api::Error> for CoreError {
    fn from(err: firelink_api::Error) -> Self {
        match err {
            firelink_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            firelink_api::Error::Network(ref e) => CoreError::Network {
                url: e.url().map_or_else(String::new, ToString::to_string),
                reason: e.to_string(),
            },
            firelink_api::Error::Http { status, .. } => {
                let message = err
                    .remote_message()
                    .map_or_else(|| "no details".to_owned(), str::to_owned);
                CoreError::Http { status, message }
            }
            firelink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            firelink_api::Error::Deserialization { message, body } => CoreError::Internal(
                format!("unexpected response: {message} (body: {body})"),
            ),
            firelink_api::Error::EventStream(reason) => CoreError::Network {
                url: String::new(),
                reason,
            },
        }
    }
}

impl CoreError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_error_carries_remote_message() {
        let err: CoreError = firelink_api::Error::Http {
            status: 400,
            body: Some(json!({"error": "Hardware is locked"})),
        }
        .into();
        assert!(
            matches!(err, CoreError::Http { status: 400, ref message } if message == "Hardware is locked")
        );
    }

    #[test]
    fn timeout_stays_timeout() {
        let err: CoreError = firelink_api::Error::Timeout { timeout_ms: 100 }.into();
        assert!(err.is_timeout());
    }
}
