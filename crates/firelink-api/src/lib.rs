// firelink-api: Async Rust client for firing-controller devices (REST + server-sent events)

pub mod error;
pub mod models;
pub mod requests;
pub mod sse;
pub mod transport;

pub use error::Error;
pub use models::{DeregisterResponse, RawDeviceMap, RawDeviceState, RawHeartbeat};
pub use requests::{ApiRequest, EVENT_STREAM_PATH, ProgramAction};
pub use sse::{EventStreamHandle, SseMessage, SseParser};
pub use transport::{DEFAULT_TIMEOUT, Transport, TransportConfig};
