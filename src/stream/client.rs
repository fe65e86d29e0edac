// Reconnecting WebSocket client for the live connection stream
//
// One socket per wall. Any close or error goes back to `Connecting` after a
// fixed delay; there is no backoff growth and no give-up. The shared
// `Cancellation` is checked before every dispatch and races every await,
// so nothing reaches the sink once teardown has begun.

use super::{now_ms, parse_inbound, Cancellation, EventSink, InboundMessage, StreamStatus, WallEvent};
use crate::error::Result;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Fixed delay before reconnecting after any close
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint, e.g. `wss://example.org/ws`
    pub url: String,
    /// Event/session the wall subscribes to
    pub event_id: String,
    pub reconnect_delay: Duration,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            event_id: event_id.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Start the stream client on the current tokio runtime
pub fn spawn_stream_client<S: EventSink>(
    config: StreamConfig,
    sink: Arc<S>,
    cancel: Cancellation,
) -> JoinHandle<()> {
    tokio::spawn(run_stream(config, sink, cancel))
}

async fn run_stream<S: EventSink>(config: StreamConfig, sink: Arc<S>, cancel: Cancellation) {
    info!(url = %config.url, event_id = %config.event_id, "Starting stream client");

    loop {
        if cancel.is_cancelled() {
            break;
        }
        cancel.dispatch(&*sink, WallEvent::Status(StreamStatus::Connecting));

        match session(&config, &*sink, &cancel).await {
            Ok(()) => debug!("Stream closed"),
            Err(e) => warn!(error = %e, "Stream connection failed"),
        }

        if cancel.is_cancelled() {
            break;
        }
        cancel.dispatch(&*sink, WallEvent::Status(StreamStatus::Disconnected));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    debug!("Stream client stopped");
}

/// One connect / subscribe / read cycle; returns when the socket closes
async fn session<S: EventSink + ?Sized>(
    config: &StreamConfig,
    sink: &S,
    cancel: &Cancellation,
) -> Result<()> {
    let (socket, _) = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        connected = connect_async(config.url.as_str()) => connected?,
    };
    let (mut write, mut read) = socket.split();

    let subscribe = json!({ "action": "subscribe", "eventId": config.event_id });
    write.send(Message::Text(subscribe.to_string())).await?;
    cancel.dispatch(sink, WallEvent::Status(StreamStatus::Connected));
    info!(event_id = %config.event_id, "Subscribed to live stream");

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            frame = read.next() => frame,
        };

        match frame {
            None | Some(Ok(Message::Close(_))) => return Ok(()),
            Some(Err(e)) => return Err(e.into()),
            Some(Ok(Message::Text(text))) => handle_text(&text, sink, cancel),
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(text, sink, cancel),
                Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
            },
            Some(Ok(_)) => {}
        }
    }
}

fn handle_text<S: EventSink + ?Sized>(text: &str, sink: &S, cancel: &Cancellation) {
    match parse_inbound(text, now_ms()) {
        Ok(InboundMessage::Snapshot(snapshot)) => {
            debug!(
                nodes = snapshot.nodes.len(),
                edges = snapshot.edges.len(),
                "Stream snapshot"
            );
            cancel.dispatch(sink, WallEvent::Snapshot(snapshot));
        }
        Ok(InboundMessage::Connection(connection)) => {
            cancel.dispatch(sink, WallEvent::Edge(connection));
        }
        Ok(InboundMessage::Ignored(kind)) => debug!(kind = %kind, "Ignoring stream message"),
        Err(e) => warn!(error = %e, "Dropping malformed stream message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[derive(Default)]
    struct SpySink {
        events: Mutex<Vec<WallEvent>>,
    }

    impl SpySink {
        fn snapshot(&self) -> Vec<WallEvent> {
            self.events.lock().unwrap().clone()
        }

        fn edges(&self) -> Vec<Edge> {
            self.snapshot()
                .into_iter()
                .filter_map(|event| match event {
                    WallEvent::Edge(conn) => Some(conn.edge),
                    _ => None,
                })
                .collect()
        }
    }

    impl EventSink for SpySink {
        fn dispatch(&self, event: WallEvent) -> bool {
            self.events.lock().unwrap().push(event);
            true
        }
    }

    /// Accepts any number of sockets; each one records the subscribe
    /// message, sends a junk frame plus one edge, then closes.
    async fn spawn_server() -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (sub_tx, sub_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let sub_tx = sub_tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    if let Some(Ok(Message::Text(text))) = ws.next().await {
                        let _ = sub_tx.send(text);
                    }
                    let _ = ws.send(Message::Text("{not json".to_string())).await;
                    let _ = ws
                        .send(Message::Text(
                            r#"{"type":"connection","from":"a","to":"b","createdAt":1000}"#
                                .to_string(),
                        ))
                        .await;
                    let _ = ws.close(None).await;
                });
            }
        });

        (format!("ws://{}", addr), sub_rx)
    }

    async fn wait_for<F: Fn(&[WallEvent]) -> bool>(spy: &SpySink, predicate: F) {
        timeout(Duration::from_secs(5), async {
            loop {
                if predicate(&spy.snapshot()) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_subscribes_and_reconnects_after_close() {
        let (url, mut subs) = spawn_server().await;
        let spy = Arc::new(SpySink::default());
        let cancel = Cancellation::new();
        let mut config = StreamConfig::new(url, "evt-42");
        config.reconnect_delay = Duration::from_millis(50);

        let handle = spawn_stream_client(config, spy.clone(), cancel.clone());

        for _ in 0..2 {
            let sub = timeout(Duration::from_secs(5), subs.recv())
                .await
                .unwrap()
                .unwrap();
            let sub: serde_json::Value = serde_json::from_str(&sub).unwrap();
            assert_eq!(sub["action"], "subscribe");
            assert_eq!(sub["eventId"], "evt-42");
        }

        // The junk frame is dropped; the edge on each session gets through
        wait_for(&spy, |events| {
            events
                .iter()
                .filter(|e| matches!(e, WallEvent::Edge(_)))
                .count()
                >= 2
        })
        .await;
        assert!(spy.edges().iter().all(|e| *e == Edge::new("a", "b", 1000)));

        cancel.cancel();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_no_dispatch_after_shutdown_mid_reconnect() {
        let (url, _subs) = spawn_server().await;
        let spy = Arc::new(SpySink::default());
        let cancel = Cancellation::new();
        let mut config = StreamConfig::new(url, "evt-1");
        config.reconnect_delay = Duration::from_millis(300);

        let handle = spawn_stream_client(config, spy.clone(), cancel.clone());

        // Wait until the first session closed and the reconnect timer runs
        wait_for(&spy, |events| {
            events.contains(&WallEvent::Status(StreamStatus::Disconnected))
        })
        .await;

        cancel.cancel();
        let seen = spy.snapshot().len();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

        // Outlast the reconnect delay; nothing else may arrive
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(spy.snapshot().len(), seen);
        assert_eq!(spy.edges().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_retrying_until_cancelled() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let spy = Arc::new(SpySink::default());
        let cancel = Cancellation::new();
        let mut config = StreamConfig::new(format!("ws://{}", addr), "evt");
        config.reconnect_delay = Duration::from_millis(20);

        let handle = spawn_stream_client(config, spy.clone(), cancel.clone());
        wait_for(&spy, |events| {
            events
                .iter()
                .filter(|e| **e == WallEvent::Status(StreamStatus::Connecting))
                .count()
                >= 3
        })
        .await;

        cancel.cancel();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(!spy
            .snapshot()
            .contains(&WallEvent::Status(StreamStatus::Connected)));
    }
}
