// Periodic snapshot fetch
//
// Catch-up path independent of the socket: fetch the trailing window of
// nodes/links over HTTP on start and on a fixed interval. Failures are
// reported to the UI and leave existing state alone.

use super::{now_ms, Cancellation, EventSink, WallEvent};
use crate::error::{Result, WallError};
use crate::graph::normalize::{normalize_snapshot, Snapshot};
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body echoed into an error message
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct SnapshotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// `<base>?eventId=..&sinceSec=..`
    pub fn request_url(&self, event_id: &str, since_sec: u64) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            [
                ("eventId", event_id.to_string()),
                ("sinceSec", since_sec.to_string()),
            ],
        )
        .map_err(|e| WallError::Config(format!("invalid snapshot url {}: {}", self.base_url, e)))
    }

    /// Fetch and normalize one snapshot
    pub async fn fetch(&self, event_id: &str, since_sec: u64) -> Result<Snapshot> {
        let url = self.request_url(event_id, since_sec)?;
        debug!(url = %url, "Fetching snapshot");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WallError::Http {
                status: status.as_u16(),
                message: body.trim().chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body: Value = response.json().await?;
        Ok(normalize_snapshot(&body, now_ms()))
    }
}

/// Fetch immediately, then every `interval`, until cancelled
pub fn spawn_snapshot_poller<S: EventSink>(
    client: SnapshotClient,
    event_id: String,
    since_sec: u64,
    interval: Duration,
    sink: Arc<S>,
    cancel: Cancellation,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(event_id = %event_id, since_sec, "Starting snapshot poller");

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = client.fetch(&event_id, since_sec) => result,
            };

            match result {
                Ok(snapshot) => {
                    debug!(
                        nodes = snapshot.nodes.len(),
                        edges = snapshot.edges.len(),
                        "Snapshot fetched"
                    );
                    cancel.dispatch(&*sink, WallEvent::Snapshot(snapshot));
                }
                Err(e) => {
                    warn!(error = %e, "Snapshot fetch failed");
                    cancel.dispatch(&*sink, WallEvent::SnapshotFailed(e.to_string()));
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!("Snapshot poller stopped");
    })
}
