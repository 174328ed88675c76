//! Server-sent-event client.
//!
//! Opens a `text/event-stream` GET, parses frames incrementally and forwards
//! each message, in arrival order, through a bounded [`tokio::sync::mpsc`]
//! channel. Reconnects the way a browser `EventSource` does: after the stream
//! ends or breaks, wait the server-advertised `retry:` delay and reconnect,
//! resending the last event id.
//!
//! # Example
//!
//! ```rust,ignore
//! use firelink_api::sse::EventStreamHandle;
//! use tokio_util::sync::CancellationToken;
//!
//! let url = url::Url::parse("http://10.0.0.12:5000/event-stream")?;
//! let mut handle = EventStreamHandle::connect(reqwest::Client::new(), url, CancellationToken::new());
//!
//! while let Some(message) = handle.recv().await {
//!     println!("{}", message.data);
//! }
//! ```

use std::time::Duration;

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;

const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Reconnect delay used until the server sends a `retry:` field.
pub const DEFAULT_RETRY: Duration = Duration::from_secs(3);

// ── SseMessage ───────────────────────────────────────────────────────

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// Last event id seen on the stream when this message was dispatched.
    pub id: Option<String>,
    /// Event type, `None` for the default `message` type.
    pub event: Option<String>,
    /// Data lines joined with `\n`.
    pub data: String,
}

// ── SseParser ────────────────────────────────────────────────────────

/// Incremental `text/event-stream` parser.
///
/// Feed it arbitrary byte chunks; it buffers partial lines across calls.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: BytesMut,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously seen event id (used across reconnects).
    pub fn with_last_event_id(last_event_id: Option<String>) -> Self {
        Self {
            last_event_id,
            ..Self::default()
        }
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Reconnect delay most recently requested by the server.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Consume a chunk and return every message completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);
        let mut messages = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw = self.buffer.split_to(pos);
            self.buffer.advance(1);

            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(message) = self.process_line(line) {
                messages.push(message);
            }
        }

        messages
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" if !value.contains('\0') => self.last_event_id = Some(value.to_owned()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            "event" => self.event = Some(value.to_owned()),
            _ => trace!(field, "ignoring unknown event-stream field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(SseMessage {
            id: self.last_event_id.clone(),
            event,
            data: std::mem::take(&mut self.data),
        })
    }
}

// ── EventStreamHandle ────────────────────────────────────────────────

/// Handle to a running event-stream subscription.
///
/// The background task stops when [`shutdown`](Self::shutdown) is called,
/// when the handle is dropped, or when the parent token is cancelled.
pub struct EventStreamHandle {
    rx: mpsc::Receiver<SseMessage>,
    cancel: CancellationToken,
}

impl EventStreamHandle {
    /// Spawn the connection loop for `url`.
    ///
    /// Returns immediately; the first connection attempt happens in the background.
    pub fn connect(http: reqwest::Client, url: Url, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            sse_loop(http, url, tx, task_cancel).await;
        });

        Self { rx, cancel }
    }

    /// Wrap a channel fed by something other than a live connection, such
    /// as a recorded session being replayed.
    pub fn from_channel(rx: mpsc::Receiver<SseMessage>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next message, or `None` once the stream has been shut down.
    pub async fn recv(&mut self) -> Option<SseMessage> {
        self.rx.recv().await
    }

    /// Signal the background task to stop. Safe to call repeatedly.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for EventStreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

async fn sse_loop(
    http: reqwest::Client,
    url: Url,
    tx: mpsc::Sender<SseMessage>,
    cancel: CancellationToken,
) {
    let mut last_event_id: Option<String> = None;
    let mut retry = DEFAULT_RETRY;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &tx, &cancel, &mut last_event_id, &mut retry) => result,
        };

        match result {
            Ok(()) => info!(%url, "event stream closed"),
            Err(e) => warn!(%url, error = %e, "event stream error"),
        }

        if tx.is_closed() || cancel.is_cancelled() {
            break;
        }

        debug!(retry_ms = retry.as_millis(), "waiting before event stream reconnect");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(retry) => {}
        }
    }

    debug!(%url, "event stream loop exiting");
}

/// Hold one connection open and forward messages until it drops.
async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    tx: &mpsc::Sender<SseMessage>,
    cancel: &CancellationToken,
    last_event_id: &mut Option<String>,
    retry: &mut Duration,
) -> Result<(), Error> {
    debug!(%url, "connecting to event stream");

    let mut request = http.get(url.clone()).header(ACCEPT, "text/event-stream");
    if let Some(id) = last_event_id.as_deref() {
        request = request.header("Last-Event-ID", id);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| Error::EventStream(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(Error::EventStream(format!("HTTP {}", resp.status())));
    }

    let mut parser = SseParser::with_last_event_id(last_event_id.clone());
    let mut body = resp.bytes_stream();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        for message in parser.feed(&bytes) {
                            if tx.send(message).await.is_err() {
                                // Receiver dropped; nobody is listening any more.
                                return Ok(());
                            }
                        }
                        last_event_id.clone_from(&parser.last_event_id().map(str::to_owned));
                        if let Some(r) = parser.retry() {
                            *retry = r;
                        }
                    }
                    Some(Err(e)) => return Err(Error::EventStream(e.to_string())),
                    None => return Ok(()),
                }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
