// Application state management
//
// `AppState` is the single owner of all wall state. The UI loop feeds it
// `WallEvent`s drained from the background tasks, ticks it for periodic
// work and asks it for a new scene every frame. Nothing else mutates it.

pub mod config;
pub mod event;
pub mod session;

pub use config::{DisplayToggles, WallConfig};
pub use session::WallSession;

use crate::graph::normalize::{Connection, Snapshot};
use crate::graph::{ActivityTracker, EdgeOutcome, ExpiringQueue, GraphStore};
use crate::render::{FrameOptions, RenderDriver, Scene};
use crate::stream::{StreamStatus, WallEvent};
use config::{
    AUTOPAN_INTERVAL_MS, PRUNE_INTERVAL_MS, TICKER_MAX, TICKER_TTL_MS,
};
use rand::Rng;
use tracing::{debug, info};

/// Longest frame step fed to the physics, in seconds
const MAX_FRAME_DT: f64 = 0.25;

/// One line of the connection ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerItem {
    pub from: String,
    pub to: String,
    pub at: i64,
}

/// Main application state
pub struct AppState {
    /// Whether the application is running
    pub running: bool,

    pub event_id: String,

    /// Panels and effects currently shown
    pub toggles: DisplayToggles,

    pub store: GraphStore,
    pub tracker: ActivityTracker,
    pub driver: RenderDriver,

    /// Recent connections, newest last
    pub ticker: ExpiringQueue<TickerItem>,

    /// Live stream connection state
    pub status: StreamStatus,

    /// Last snapshot failure, cleared by the next success
    pub snapshot_error: Option<String>,

    pub last_snapshot_at: Option<i64>,

    /// Scene built by the latest `render_frame`
    pub scene: Scene,

    last_prune: i64,
    last_autopan: i64,
    last_frame: Option<i64>,
}

impl AppState {
    pub fn new(config: &WallConfig, now: i64) -> Self {
        Self {
            running: true,
            event_id: config.event_id.clone(),
            toggles: config.toggles,
            store: GraphStore::with_limits(config.dedupe_grace_ms, config.max_edges),
            tracker: ActivityTracker::new(),
            driver: RenderDriver::new(),
            ticker: ExpiringQueue::new(TICKER_TTL_MS),
            status: StreamStatus::default(),
            snapshot_error: None,
            last_snapshot_at: None,
            scene: Scene::default(),
            last_prune: now,
            // First autopan fires on the first tick
            last_autopan: now - AUTOPAN_INTERVAL_MS,
            last_frame: None,
        }
    }

    /// Apply one event from the background tasks
    pub fn apply<R: Rng>(&mut self, event: WallEvent, now: i64, rng: &mut R) {
        match event {
            WallEvent::Status(status) => {
                if status != self.status {
                    info!(status = status.label(), "Stream status changed");
                }
                self.status = status;
            }
            WallEvent::Snapshot(snapshot) => self.apply_snapshot(snapshot, now),
            WallEvent::Edge(connection) => self.apply_connection(connection, now, rng),
            WallEvent::SnapshotFailed(message) => {
                self.snapshot_error = Some(message);
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot, now: i64) {
        let stats = self.store.merge_snapshot(snapshot.nodes, snapshot.edges);
        info!(
            nodes_added = stats.nodes_added,
            edges_added = stats.edges_added,
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "Merged snapshot"
        );
        self.snapshot_error = None;
        self.last_snapshot_at = Some(now);
    }

    fn apply_connection<R: Rng>(&mut self, connection: Connection, now: i64, rng: &mut R) {
        let Connection { from, to, edge } = connection;
        if self.store.is_expired(&edge) {
            debug!(source = %edge.source, target = %edge.target, "Live edge older than wall history");
            return;
        }

        // New endpoints appear next to the endpoint that is already on the wall
        let from_new = self.store.upsert_node(from);
        let to_new = self.store.upsert_node(to);
        if from_new {
            self.driver
                .spawn_node(&edge.source, Some(edge.target.as_str()), now, rng);
        }
        if to_new {
            self.driver
                .spawn_node(&edge.target, Some(edge.source.as_str()), now, rng);
        }

        match self.store.add_live_edge(edge.clone()) {
            EdgeOutcome::Added => {
                self.tracker.record(&edge, now);
                let name = |id: &str| {
                    self.store
                        .node(id)
                        .map_or_else(|| id.to_string(), |node| node.name.clone())
                };
                let item = TickerItem {
                    from: name(edge.source.as_str()),
                    to: name(edge.target.as_str()),
                    at: edge.created_at,
                };
                self.ticker.push(item, now);
                self.ticker.truncate_oldest(TICKER_MAX);
                self.driver
                    .spotlight(&[edge.source.as_str(), edge.target.as_str()], now + TICKER_TTL_MS);
            }
            outcome => debug!(?outcome, source = %edge.source, target = %edge.target, "Live edge not added"),
        }
    }

    /// Periodic work: pruning every 2 s, autopan every 9 s
    pub fn on_tick<R: Rng>(&mut self, now: i64, rng: &mut R) {
        if now - self.last_prune >= PRUNE_INTERVAL_MS {
            self.last_prune = now;
            self.tracker.prune(now);
            self.ticker.prune(now);
        }

        if self.toggles.autopan && now - self.last_autopan >= AUTOPAN_INTERVAL_MS {
            self.last_autopan = now;
            self.driver.autopan(&self.tracker, now, rng);
        }
    }

    /// Step the simulation and rebuild the scene
    pub fn render_frame(&mut self, now: i64) {
        let dt = self
            .last_frame
            .map_or(0.0, |last| ((now - last).max(0) as f64 / 1000.0).min(MAX_FRAME_DT));
        self.last_frame = Some(now);

        self.scene = self.driver.frame(
            &self.store,
            &self.tracker,
            now,
            dt,
            FrameOptions {
                heat: self.toggles.heat,
                drift: self.toggles.autopan,
            },
        );
    }

    pub fn toggle_leaderboard(&mut self) {
        self.toggles.leaderboard = !self.toggles.leaderboard;
    }

    pub fn toggle_ticker(&mut self) {
        self.toggles.ticker = !self.toggles.ticker;
    }

    pub fn toggle_autopan(&mut self) {
        self.toggles.autopan = !self.toggles.autopan;
    }

    pub fn toggle_heat(&mut self) {
        self.toggles.heat = !self.toggles.heat;
    }
}

/// Offline configuration for unit tests
#[cfg(test)]
pub(crate) fn test_config() -> WallConfig {
    WallConfig {
        event_id: "evt".to_string(),
        ws_url: "ws://127.0.0.1:1".to_string(),
        snapshot_url: None,
        since_sec: 60,
        snapshot_refresh: std::time::Duration::from_secs(30),
        toggles: DisplayToggles::default(),
        dedupe_grace_ms: 4_000,
        max_edges: None,
        log_file: std::path::PathBuf::from("connwall.log"),
    }
}
