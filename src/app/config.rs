// Application configuration
//
// This module contains:
// - timing constants for the UI loop and periodic work
// - the clap command line (with CONNWALL_* environment fallbacks)
// - display toggles parsed from a query string
// - the validated `WallConfig` the rest of the app runs on

use crate::error::WallError;
use crate::graph::store::{DEFAULT_DEDUPE_GRACE_MS, DEFAULT_MAX_EDGES};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// UI frame interval (~30 fps)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Trail and queue pruning period
pub const PRUNE_INTERVAL_MS: i64 = 2_000;

/// Autopan period
pub const AUTOPAN_INTERVAL_MS: i64 = 9_000;

/// Lifetime of a ticker (spotlight) entry
pub const TICKER_TTL_MS: i64 = 8_000;

/// Ticker entries kept at once
pub const TICKER_MAX: usize = 8;

/// Leaderboard rows
pub const LEADERBOARD_SIZE: usize = 10;

/// Default snapshot lookback (24 hours)
pub const DEFAULT_SINCE_SEC: u64 = 86_400;

pub const DEFAULT_SNAPSHOT_REFRESH_SECS: u64 = 30;

/// Upper bound on waiting for background tasks at shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Events applied per frame at most, so a burst cannot stall drawing
pub const MAX_EVENTS_PER_FRAME: usize = 512;

// ============================================================================
// Display toggles
// ============================================================================

/// Panel and effect switches, read once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayToggles {
    /// Unattended display: no header, no status bar, no cursor
    pub kiosk: bool,
    pub autopan: bool,
    pub ticker: bool,
    pub leaderboard: bool,
    pub heat: bool,
}

impl Default for DisplayToggles {
    fn default() -> Self {
        Self {
            kiosk: false,
            autopan: true,
            ticker: true,
            leaderboard: true,
            heat: false,
        }
    }
}

impl DisplayToggles {
    /// Parse `kiosk=1&autopan=0&ticker=0&leaderboard=0&heat=0|1`
    ///
    /// A leading `?` is accepted. Unknown keys and unparsable values are
    /// ignored. Without an explicit `heat`, the heatmap follows kiosk mode.
    pub fn from_query(query: &str) -> Self {
        let mut toggles = Self::default();
        let mut heat = None;

        for pair in query.trim().trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, "1"));
            let Some(flag) = parse_flag(value) else {
                tracing::debug!(key, value, "Ignoring display toggle with bad value");
                continue;
            };
            match key.to_ascii_lowercase().as_str() {
                "kiosk" => toggles.kiosk = flag,
                "autopan" => toggles.autopan = flag,
                "ticker" => toggles.ticker = flag,
                "leaderboard" => toggles.leaderboard = flag,
                "heat" => heat = Some(flag),
                other => tracing::debug!(key = other, "Ignoring unknown display toggle"),
            }
        }

        toggles.heat = heat.unwrap_or(toggles.kiosk);
        toggles
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "connwall",
    version,
    about = "Connection Wall: live force-directed social graph for event kiosks"
)]
pub struct Cli {
    /// Event/session whose connections are shown
    #[arg(long, env = "CONNWALL_EVENT_ID")]
    pub event_id: String,

    /// WebSocket endpoint of the live connection stream (ws:// or wss://)
    #[arg(long, env = "CONNWALL_WS_URL")]
    pub ws_url: String,

    /// HTTP endpoint for periodic snapshots; polling is off when omitted
    #[arg(long, env = "CONNWALL_SNAPSHOT_URL")]
    pub snapshot_url: Option<String>,

    /// Snapshot lookback window in seconds
    #[arg(long, env = "CONNWALL_SINCE_SEC", default_value_t = DEFAULT_SINCE_SEC)]
    pub since_sec: u64,

    /// Seconds between snapshot fetches
    #[arg(long, env = "CONNWALL_SNAPSHOT_REFRESH_SECS", default_value_t = DEFAULT_SNAPSHOT_REFRESH_SECS)]
    pub snapshot_refresh_secs: u64,

    /// Display toggles as a query string, e.g. "kiosk=1&heat=0"
    #[arg(long, env = "CONNWALL_DISPLAY", default_value = "")]
    pub display: String,

    /// Near-duplicate window for live edges on the same pair, in ms
    #[arg(long, env = "CONNWALL_DEDUPE_GRACE_MS", default_value_t = DEFAULT_DEDUPE_GRACE_MS)]
    pub dedupe_grace_ms: i64,

    /// Edge history cap; 0 keeps everything
    #[arg(long, env = "CONNWALL_MAX_EDGES", default_value_t = DEFAULT_MAX_EDGES)]
    pub max_edges: usize,

    /// Log file (the terminal belongs to the wall)
    #[arg(long, env = "CONNWALL_LOG_FILE", default_value = "connwall.log")]
    pub log_file: PathBuf,
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WallConfig {
    pub event_id: String,
    pub ws_url: String,
    pub snapshot_url: Option<String>,
    pub since_sec: u64,
    pub snapshot_refresh: Duration,
    pub toggles: DisplayToggles,
    pub dedupe_grace_ms: i64,
    pub max_edges: Option<usize>,
    pub log_file: PathBuf,
}

impl Cli {
    pub fn into_config(self) -> Result<WallConfig, WallError> {
        let event_id = self.event_id.trim().to_string();
        if event_id.is_empty() {
            return Err(WallError::Config("event id must not be empty".to_string()));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(WallError::Config(format!(
                "stream url must start with ws:// or wss://, got {}",
                self.ws_url
            )));
        }
        if self.snapshot_refresh_secs == 0 {
            return Err(WallError::Config(
                "snapshot refresh must be at least one second".to_string(),
            ));
        }
        if self.dedupe_grace_ms < 0 {
            return Err(WallError::Config(
                "dedupe grace window must not be negative".to_string(),
            ));
        }

        Ok(WallConfig {
            event_id,
            ws_url: self.ws_url,
            snapshot_url: self.snapshot_url.filter(|url| !url.trim().is_empty()),
            since_sec: self.since_sec,
            snapshot_refresh: Duration::from_secs(self.snapshot_refresh_secs),
            toggles: DisplayToggles::from_query(&self.display),
            dedupe_grace_ms: self.dedupe_grace_ms,
            max_edges: (self.max_edges > 0).then_some(self.max_edges),
            log_file: self.log_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<WallConfig, WallError> {
        let mut argv = vec!["connwall"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_config()
    }

    #[test]
    fn test_default_toggles() {
        let toggles = DisplayToggles::from_query("");
        assert_eq!(toggles, DisplayToggles::default());
        assert!(toggles.autopan && toggles.ticker && toggles.leaderboard);
        assert!(!toggles.kiosk && !toggles.heat);
    }

    #[test]
    fn test_query_toggles() {
        let toggles = DisplayToggles::from_query("?kiosk=1&autopan=0&ticker=0&leaderboard=0");
        assert!(toggles.kiosk);
        assert!(!toggles.autopan);
        assert!(!toggles.ticker);
        assert!(!toggles.leaderboard);
        // Heatmap follows kiosk unless forced
        assert!(toggles.heat);

        assert!(!DisplayToggles::from_query("kiosk=1&heat=0").heat);
        assert!(DisplayToggles::from_query("heat=1").heat);
    }

    #[test]
    fn test_query_ignores_noise() {
        let toggles = DisplayToggles::from_query("foo=bar&&autopan=maybe&TICKER=0");
        assert!(toggles.autopan);
        assert!(!toggles.ticker);
    }

    #[test]
    fn test_cli_into_config() {
        let config = parse(&[
            "--event-id",
            " evt-7 ",
            "--ws-url",
            "wss://stream.example.org/ws",
            "--snapshot-url",
            "https://api.example.org/snapshot",
            "--display",
            "kiosk=1",
            "--max-edges",
            "0",
        ])
        .unwrap();

        assert_eq!(config.event_id, "evt-7");
        assert_eq!(config.snapshot_refresh, Duration::from_secs(30));
        assert_eq!(config.since_sec, DEFAULT_SINCE_SEC);
        assert_eq!(config.dedupe_grace_ms, DEFAULT_DEDUPE_GRACE_MS);
        assert_eq!(config.max_edges, None);
        assert!(config.toggles.kiosk);
        assert_eq!(config.log_file, PathBuf::from("connwall.log"));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(matches!(
            parse(&["--event-id", "e", "--ws-url", "http://nope"]),
            Err(WallError::Config(_))
        ));
        assert!(matches!(
            parse(&["--event-id", "  ", "--ws-url", "ws://x"]),
            Err(WallError::Config(_))
        ));
        assert!(matches!(
            parse(&[
                "--event-id",
                "e",
                "--ws-url",
                "ws://x",
                "--snapshot-refresh-secs",
                "0"
            ]),
            Err(WallError::Config(_))
        ));
    }
}
