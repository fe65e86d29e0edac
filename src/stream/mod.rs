// Live data path
//
// The stream client and the snapshot poller run as tokio tasks and talk to
// the UI thread through a single channel of tagged `WallEvent`s. Both share
// a `Cancellation` so teardown stops every dispatch at once.

pub mod client;
pub mod snapshot;

use crate::graph::normalize::{self, Connection, Snapshot};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

pub use client::{spawn_stream_client, StreamConfig};
pub use snapshot::{spawn_snapshot_poller, SnapshotClient};

/// Wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Connection state of the live stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl StreamStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StreamStatus::Disconnected => "offline",
            StreamStatus::Connecting => "connecting",
            StreamStatus::Connected => "live",
        }
    }
}

/// Everything the UI thread consumes, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum WallEvent {
    Status(StreamStatus),
    /// Bulk state from the socket or the periodic fetch
    Snapshot(Snapshot),
    /// A single live connection
    Edge(Connection),
    SnapshotFailed(String),
}

/// Destination for events produced by background tasks
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one event; returns `false` once the receiver is gone
    fn dispatch(&self, event: WallEvent) -> bool;
}

impl EventSink for mpsc::UnboundedSender<WallEvent> {
    fn dispatch(&self, event: WallEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Shared teardown flag for all background tasks of one wall
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Dispatch unless teardown has begun
    pub fn dispatch<S: EventSink + ?Sized>(&self, sink: &S, event: WallEvent) -> bool {
        if self.is_cancelled() {
            return false;
        }
        sink.dispatch(event)
    }
}

/// Inbound socket message, discriminated by `type`
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Snapshot(Snapshot),
    Connection(Connection),
    /// Well-formed JSON we do not handle
    Ignored(String),
}

/// Parse one text frame from the socket
///
/// The body of a message may be flat or nested under `payload` / `data`.
pub fn parse_inbound(text: &str, now: i64) -> crate::error::Result<InboundMessage> {
    let message: Value = serde_json::from_str(text)?;
    let kind = message
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let body = ["payload", "data"]
        .iter()
        .find_map(|key| message.get(*key).filter(|v| v.is_object()))
        .unwrap_or(&message);

    match kind.as_str() {
        "snapshot" => Ok(InboundMessage::Snapshot(normalize::normalize_snapshot(
            body, now,
        ))),
        "connection" | "edge" => normalize::normalize_connection(body, now)
            .map(InboundMessage::Connection)
            .ok_or_else(|| {
                crate::error::WallError::Parse(format!("{} message without endpoints", kind))
            }),
        _ => Ok(InboundMessage::Ignored(kind)),
    }
}
