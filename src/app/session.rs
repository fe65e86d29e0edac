// Background task lifecycle
//
// The UI loop stays synchronous. A `WallSession` owns a tokio runtime that
// runs the stream client and the optional snapshot poller; both report
// into one unbounded channel that the UI drains each frame.

use super::config::{WallConfig, SHUTDOWN_TIMEOUT};
use crate::stream::{
    spawn_snapshot_poller, spawn_stream_client, Cancellation, SnapshotClient, StreamConfig,
    WallEvent,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct WallSession {
    runtime: Option<Runtime>,
    events: UnboundedReceiver<WallEvent>,
    cancel: Cancellation,
    tasks: Vec<JoinHandle<()>>,
}

impl WallSession {
    /// Spin up the runtime and start all background tasks
    pub fn start(config: &WallConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("connwall-io")
            .enable_all()
            .build()
            .context("Failed to build async runtime")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(tx);
        let cancel = Cancellation::new();
        let mut tasks = Vec::new();

        let guard = runtime.enter();

        let stream = StreamConfig::new(config.ws_url.clone(), config.event_id.clone());
        info!(url = %stream.url, event_id = %stream.event_id, "Starting live stream");
        tasks.push(spawn_stream_client(stream, Arc::clone(&sink), cancel.clone()));

        if let Some(url) = &config.snapshot_url {
            let client = SnapshotClient::new(url.clone())
                .context("Failed to create snapshot HTTP client")?;
            tasks.push(spawn_snapshot_poller(
                client,
                config.event_id.clone(),
                config.since_sec,
                config.snapshot_refresh,
                Arc::clone(&sink),
                cancel.clone(),
            ));
        }

        drop(guard);

        Ok(Self {
            runtime: Some(runtime),
            events: rx,
            cancel,
            tasks,
        })
    }

    /// Next pending event without blocking
    pub fn try_next(&mut self) -> Option<WallEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Up to `max` pending events, oldest first
    pub fn drain(&mut self, max: usize) -> Vec<WallEvent> {
        std::iter::from_fn(|| self.try_next()).take(max).collect()
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every task and wait (bounded) for them to finish
    ///
    /// Events still queued are discarded. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        let tasks = std::mem::take(&mut self.tasks);
        let joined = runtime.block_on(async {
            tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(tasks)).await
        });
        match joined {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Background task ended abnormally");
                    }
                }
            }
            Err(_) => warn!("Background tasks did not stop in time"),
        }

        runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
        while self.events.try_recv().is_ok() {}
        info!("Session shut down");
    }
}

impl Drop for WallSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
