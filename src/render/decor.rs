// Per-node decorations
//
// Pure functions from graph/tracker state to visual parameters, plus the
// pooled heatmap sprites.

use super::layout::Vec3;
use crate::graph::NodeId;
use ratatui::style::Color;

/// Activity ring fades out over this long after the last edge
pub const RING_DECAY_MS: i64 = 45_000;

/// Intro animation length for freshly spawned nodes
pub const INTRO_MS: i64 = 900;
pub const INTRO_START_SCALE: f64 = 0.05;

/// Labels are fully visible up to this camera distance...
pub const LABEL_NEAR: f64 = 30.0;
/// ...and hidden beyond this one
pub const LABEL_FAR: f64 = 80.0;

/// Heat sprites cover nodes active within this window
pub const HEAT_WINDOW_MS: i64 = 30_000;
pub const HEAT_POOL_CAP: usize = 64;

const NODE_RADIUS_BASE: f64 = 1.0;
const NODE_RADIUS_PER_DEGREE: f64 = 0.35;
const NODE_RADIUS_MAX: f64 = 4.0;

/// Stable hue in degrees derived from the node id (FNV-1a)
pub fn hue_for(id: &str) -> f64 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in id.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    f64::from(hash % 360)
}

/// HSL (hue in degrees, saturation and lightness in 0..=1) to RGB
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);
    let h = hue.rem_euclid(360.0) / 60.0;

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}

pub fn node_color(id: &str) -> (u8, u8, u8) {
    hsl_to_rgb(hue_for(id), 0.65, 0.6)
}

/// World-space radius of a node's core sphere
pub fn node_radius(degree: usize) -> f64 {
    (NODE_RADIUS_BASE + NODE_RADIUS_PER_DEGREE * (degree as f64).sqrt()).min(NODE_RADIUS_MAX)
}

/// Linear fade of the "recent activity" ring
pub fn ring_opacity(last_seen: Option<i64>, now: i64) -> f64 {
    match last_seen {
        Some(seen) => {
            let age = now.saturating_sub(seen).max(0) as f64;
            (1.0 - age / RING_DECAY_MS as f64).clamp(0.0, 1.0)
        }
        None => 0.0,
    }
}

/// Glow strength; busier and more recently active nodes glow brighter
pub fn halo_intensity(degree: usize, ring: f64) -> f64 {
    (0.2 + 0.05 * degree.min(10) as f64 + 0.3 * ring).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crown {
    Gold,
    Silver,
    Bronze,
}

impl Crown {
    /// Crown for a leaderboard position (0 = top)
    pub fn for_rank(rank: usize) -> Option<Crown> {
        match rank {
            0 => Some(Crown::Gold),
            1 => Some(Crown::Silver),
            2 => Some(Crown::Bronze),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        "♛"
    }

    pub fn color(&self) -> Color {
        match self {
            Crown::Gold => Color::Rgb(255, 215, 0),
            Crown::Silver => Color::Rgb(192, 192, 192),
            Crown::Bronze => Color::Rgb(205, 127, 50),
        }
    }
}

/// Label visibility from camera distance; hovered or focused nodes always show
pub fn label_opacity(distance: f64, emphasized: bool) -> f64 {
    if emphasized {
        return 1.0;
    }
    if distance <= LABEL_NEAR {
        1.0
    } else if distance >= LABEL_FAR {
        0.0
    } else {
        1.0 - (distance - LABEL_NEAR) / (LABEL_FAR - LABEL_NEAR)
    }
}

/// Back-out easing: overshoots slightly past 1 before settling
pub fn ease_out_back(t: f64) -> f64 {
    const C1: f64 = 1.70158;
    const C3: f64 = C1 + 1.0;
    let t = t.clamp(0.0, 1.0) - 1.0;
    1.0 + C3 * t * t * t + C1 * t * t
}

/// Scale of a node during its intro animation
pub fn intro_scale(spawned_at: i64, now: i64) -> f64 {
    let t = now.saturating_sub(spawned_at).max(0) as f64 / INTRO_MS as f64;
    if t >= 1.0 {
        return 1.0;
    }
    INTRO_START_SCALE + (1.0 - INTRO_START_SCALE) * ease_out_back(t)
}

/// Opacity of a trail segment, `1 - age/window`
pub fn trail_opacity(created_at: i64, now: i64, window_ms: i64) -> f64 {
    if window_ms <= 0 {
        return 0.0;
    }
    let age = now.saturating_sub(created_at).max(0) as f64;
    (1.0 - age / window_ms as f64).clamp(0.0, 1.0)
}

pub fn heat_intensity(last_seen: i64, now: i64) -> f64 {
    trail_opacity(last_seen, now, HEAT_WINDOW_MS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatSprite {
    pub node_id: NodeId,
    pub position: Vec3,
    pub intensity: f64,
}

/// Heatmap sprites reused from frame to frame
///
/// The backing vector only grows when a frame needs more sprites than any
/// frame before it, and never past the cap.
#[derive(Debug, Clone)]
pub struct HeatPool {
    sprites: Vec<HeatSprite>,
    active: usize,
    cap: usize,
}

impl HeatPool {
    pub fn new(cap: usize) -> Self {
        Self {
            sprites: Vec::new(),
            active: 0,
            cap,
        }
    }

    /// Replace the active set, reusing existing sprites
    pub fn refill<'a, I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, Vec3, f64)>,
    {
        self.active = 0;
        for (id, position, intensity) in items.into_iter().take(self.cap) {
            if let Some(sprite) = self.sprites.get_mut(self.active) {
                sprite.node_id.clear();
                sprite.node_id.push_str(id);
                sprite.position = position;
                sprite.intensity = intensity;
            } else {
                self.sprites.push(HeatSprite {
                    node_id: id.to_string(),
                    position,
                    intensity,
                });
            }
            self.active += 1;
        }
        self.active
    }

    pub fn clear(&mut self) {
        self.active = 0;
    }

    pub fn active(&self) -> &[HeatSprite] {
        &self.sprites[..self.active]
    }

    /// Sprites allocated so far, active or idle
    #[cfg(test)]
    pub fn allocated(&self) -> usize {
        self.sprites.len()
    }
}

impl Default for HeatPool {
    fn default() -> Self {
        Self::new(HEAT_POOL_CAP)
    }
}
