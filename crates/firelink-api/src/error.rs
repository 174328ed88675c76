use thiserror::Error;

/// Top-level error type for the `firelink-api` crate.
///
/// Covers every way a single request or an event-stream connection can fail.
/// `firelink-core` folds these into its own `CoreError` and, at the command
/// gateway boundary, into a plain failure status.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No complete response arrived within the configured bound.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transport-level failure (DNS, connection refused, reset, aborted).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Remote rejection ────────────────────────────────────────────
    /// The device answered with a status outside `200..=299`.
    ///
    /// `body` is the response parsed as JSON when that was possible.
    #[error("HTTP {status} from device")]
    Http {
        status: u16,
        body: Option<serde_json::Value>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// A 2xx response whose body was not valid JSON, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Event stream ────────────────────────────────────────────────
    /// The server-sent-event connection could not be opened or broke mid-stream.
    #[error("Event stream error: {0}")]
    EventStream(String),
}

impl Error {
    /// Fold a `reqwest::Error` into the taxonomy, keeping timeouts distinct.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else {
            Self::Network(err)
        }
    }

    /// Returns `true` if the request was cut off by its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The HTTP status the device answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Best-effort human message from an HTTP error body.
    ///
    /// The backend reports failures as `{"error": "..."}` or `{"message": "..."}`.
    pub fn remote_message(&self) -> Option<&str> {
        let Self::Http { body: Some(body), .. } = self else {
            return None;
        };
        body.get("error")
            .or_else(|| body.get("message"))
            .and_then(serde_json::Value::as_str)
    }
}
