// Temporal derived state
//
// Tracks when each node was last active, short activity streaks and a
// bounded trail of recent edges. Every accepted live edge goes through
// `ActivityTracker::record`; a periodic `prune` drops aged entries.

use super::{Edge, NodeId};
use std::collections::{HashMap, VecDeque};

/// Streak counting window (2 minutes)
pub const STREAK_WINDOW_MS: i64 = 120_000;

/// Streak length that triggers an achievement
pub const STREAK_THRESHOLD: usize = 3;

/// How long an achievement stays on screen
pub const ACHIEVEMENT_TTL_MS: i64 = 5_000;

/// Age after which trail entries are dropped
pub const TRAIL_WINDOW_MS: i64 = 80_000;

/// Hard cap on trail length
pub const TRAIL_MAX: usize = 180;

/// Queue of transient items that disappear after a fixed lifetime
#[derive(Debug, Clone)]
pub struct ExpiringQueue<T> {
    items: VecDeque<(i64, T)>,
    ttl_ms: i64,
}

impl<T> ExpiringQueue<T> {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            items: VecDeque::new(),
            ttl_ms,
        }
    }

    pub fn push(&mut self, item: T, now: i64) {
        self.items.push_back((now + self.ttl_ms, item));
    }

    /// Drop expired items, returns how many were removed
    pub fn prune(&mut self, now: i64) -> usize {
        let before = self.items.len();
        self.items.retain(|(expires_at, _)| *expires_at > now);
        before - self.items.len()
    }

    /// Keep only the newest `max` items
    pub fn truncate_oldest(&mut self, max: usize) {
        while self.items.len() > max {
            self.items.pop_front();
        }
    }

    /// Items oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.items.iter().map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One-shot notification that a node hit the streak threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub node_id: NodeId,
    pub streak: usize,
    pub at: i64,
}

/// A recent edge kept for the line-trail effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailEntry {
    pub source: NodeId,
    pub target: NodeId,
    pub created_at: i64,
}

/// Per-node recency, streak counters and the trail buffer
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    last_seen: HashMap<NodeId, i64>,
    streaks: HashMap<NodeId, Vec<i64>>,
    trail: VecDeque<TrailEntry>,
    achievements: ExpiringQueue<Achievement>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self {
            last_seen: HashMap::new(),
            streaks: HashMap::new(),
            trail: VecDeque::new(),
            achievements: ExpiringQueue::new(ACHIEVEMENT_TTL_MS),
        }
    }

    /// Account for an accepted live edge
    ///
    /// Returns the achievements emitted by this edge. A streak fires only
    /// when its length becomes exactly `STREAK_THRESHOLD`, so a node keeps
    /// quiet until its window drains below the threshold again.
    pub fn record(&mut self, edge: &Edge, now: i64) -> Vec<Achievement> {
        let at = edge.created_at;
        let mut fired = Vec::new();

        let mut endpoints = vec![edge.source.clone()];
        if edge.target != edge.source {
            endpoints.push(edge.target.clone());
        }

        for id in endpoints {
            let seen = self.last_seen.entry(id.clone()).or_insert(at);
            *seen = (*seen).max(at);

            let streak = self.streaks.entry(id.clone()).or_default();
            streak.retain(|t| at.saturating_sub(*t) <= STREAK_WINDOW_MS);
            streak.push(at);

            if streak.len() == STREAK_THRESHOLD {
                let achievement = Achievement {
                    node_id: id,
                    streak: streak.len(),
                    at,
                };
                tracing::info!(node = %achievement.node_id, "Streak achievement");
                self.achievements.push(achievement.clone(), now);
                fired.push(achievement);
            }
        }

        self.trail.push_back(TrailEntry {
            source: edge.source.clone(),
            target: edge.target.clone(),
            created_at: at,
        });
        while self.trail.len() > TRAIL_MAX {
            self.trail.pop_front();
        }

        fired
    }

    /// Periodic cleanup of the trail, achievements and idle streak lists
    pub fn prune(&mut self, now: i64) {
        self.trail
            .retain(|entry| now.saturating_sub(entry.created_at) <= TRAIL_WINDOW_MS);
        self.achievements.prune(now);
        self.streaks.retain(|_, times| {
            times
                .last()
                .is_some_and(|newest| now.saturating_sub(*newest) <= STREAK_WINDOW_MS)
        });
    }

    pub fn last_seen(&self, id: &str) -> Option<i64> {
        self.last_seen.get(id).copied()
    }

    #[cfg(test)]
    pub fn streak_len(&self, id: &str) -> usize {
        self.streaks.get(id).map_or(0, Vec::len)
    }

    /// Nodes active within `window_ms` of `now`, most recent first
    pub fn recently_active(&self, now: i64, window_ms: i64) -> Vec<(NodeId, i64)> {
        let mut active: Vec<(NodeId, i64)> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.saturating_sub(**seen) <= window_ms)
            .map(|(id, seen)| (id.clone(), *seen))
            .collect();
        active.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        active
    }

    /// Trail entries oldest first
    pub fn trail(&self) -> impl Iterator<Item = &TrailEntry> {
        self.trail.iter()
    }

    #[cfg(test)]
    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn achievements(&self) -> &ExpiringQueue<Achievement> {
        &self.achievements
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
