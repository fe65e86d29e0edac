// Render/physics driver
//
// Owns the force layout, the camera and the heat sprite pool. Every frame
// it steps the simulation and turns store + tracker state into a `Scene`
// of projected, decorated primitives that the UI paints onto the canvas.

pub mod camera;
pub mod decor;
pub mod layout;

pub use camera::Camera;
pub use decor::{Crown, HeatPool};
pub use layout::ForceLayout;

use crate::graph::tracker::TRAIL_WINDOW_MS;
use crate::graph::{ActivityTracker, GraphStore, NodeId};
use rand::Rng;
use std::collections::HashMap;

/// World-space radius of a heat sprite at full intensity
const HEAT_RADIUS: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub id: NodeId,
    pub label: String,
    /// Projected position, see [`camera::Projected`]
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    /// Screen-space radius including perspective and intro scale
    pub radius: f64,
    pub color: (u8, u8, u8),
    pub halo: f64,
    pub ring: f64,
    pub crown: Option<Crown>,
    pub label_opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrailSegment {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub opacity: f64,
    pub color: (u8, u8, u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatSpot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub intensity: f64,
}

/// Everything needed to paint one frame, back to front
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub heat: Vec<HeatSpot>,
    pub trails: Vec<TrailSegment>,
    /// Farthest first
    pub nodes: Vec<NodeVisual>,
    pub focus: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    pub heat: bool,
    /// Slowly orbit while no transition is running
    pub drift: bool,
}

#[derive(Debug, Clone)]
pub struct RenderDriver {
    layout: ForceLayout,
    camera: Camera,
    heat: HeatPool,
    focus: Option<NodeId>,
    /// Nodes whose labels stay visible until the given instant
    spotlight: HashMap<NodeId, i64>,
}

impl RenderDriver {
    pub fn new() -> Self {
        Self {
            layout: ForceLayout::new(),
            camera: Camera::new(),
            heat: HeatPool::default(),
            focus: None,
            spotlight: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    #[cfg(test)]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[cfg(test)]
    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    /// Lay out a new node, next to `anchor` when that one has a position
    pub fn spawn_node<R: Rng>(
        &mut self,
        id: &str,
        anchor: Option<&str>,
        now: i64,
        rng: &mut R,
    ) -> bool {
        match anchor.and_then(|a| self.layout.position(a)) {
            Some(position) => self.layout.spawn_near(id, position, now, rng),
            None => self.layout.ensure(id, now),
        }
    }

    /// Keep labels of `ids` visible until `until`
    pub fn spotlight(&mut self, ids: &[&str], until: i64) {
        for id in ids {
            let entry = self.spotlight.entry((*id).to_string()).or_insert(until);
            *entry = (*entry).max(until);
        }
    }

    /// Fly to the next point of interest; returns the focused node, if any
    pub fn autopan<R: Rng>(
        &mut self,
        tracker: &ActivityTracker,
        now: i64,
        rng: &mut R,
    ) -> Option<NodeId> {
        let (pose, focus) = camera::autopan_pose(&self.camera, tracker, &self.layout, now, rng)?;
        tracing::debug!(focus = ?focus, "Autopan");
        self.camera.fly_to(pose, now);
        self.focus = focus.clone();
        focus
    }

    /// Step physics and camera, then build the scene
    pub fn frame(
        &mut self,
        store: &GraphStore,
        tracker: &ActivityTracker,
        now: i64,
        dt: f64,
        options: FrameOptions,
    ) -> Scene {
        self.layout.sync(store, now);
        self.layout.step(store, dt);
        self.camera.update(now, dt, options.drift);
        self.spotlight.retain(|_, until| *until > now);

        let mut nodes: Vec<NodeVisual> = store
            .nodes()
            .into_iter()
            .filter_map(|node| {
                let body = self.layout.body(&node.id)?;
                let projected = self.camera.project(body.position)?;
                let degree = store.degree(&node.id);
                let ring = decor::ring_opacity(tracker.last_seen(&node.id), now);
                let intro = decor::intro_scale(body.spawned_at, now);
                let emphasized = self.focus.as_deref() == Some(node.id.as_str())
                    || self.spotlight.contains_key(&node.id);

                Some(NodeVisual {
                    id: node.id.clone(),
                    label: node.name.clone(),
                    x: projected.x,
                    y: projected.y,
                    depth: projected.depth,
                    radius: decor::node_radius(degree) * projected.scale * intro,
                    color: decor::node_color(&node.id),
                    halo: decor::halo_intensity(degree, ring),
                    ring,
                    crown: store.rank_of(&node.id).and_then(Crown::for_rank),
                    label_opacity: decor::label_opacity(projected.depth, emphasized),
                })
            })
            .collect();
        nodes.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        let trails = tracker
            .trail()
            .filter_map(|entry| {
                let from = self.camera.project(self.layout.position(&entry.source)?)?;
                let to = self.camera.project(self.layout.position(&entry.target)?)?;
                Some(TrailSegment {
                    from: (from.x, from.y),
                    to: (to.x, to.y),
                    opacity: decor::trail_opacity(entry.created_at, now, TRAIL_WINDOW_MS),
                    color: decor::node_color(&entry.source),
                })
            })
            .filter(|segment| segment.opacity > 0.0)
            .collect();

        let heat = if options.heat {
            let active = tracker.recently_active(now, decor::HEAT_WINDOW_MS);
            let layout = &self.layout;
            self.heat.refill(active.iter().filter_map(|(id, seen)| {
                layout
                    .position(id)
                    .map(|pos| (id.as_str(), pos, decor::heat_intensity(*seen, now)))
            }));
            self.heat
                .active()
                .iter()
                .filter_map(|sprite| {
                    let p = self.camera.project(sprite.position)?;
                    Some(HeatSpot {
                        x: p.x,
                        y: p.y,
                        radius: HEAT_RADIUS * sprite.intensity.max(0.3) * p.scale,
                        intensity: sprite.intensity,
                    })
                })
                .collect()
        } else {
            self.heat.clear();
            Vec::new()
        };

        Scene {
            heat,
            trails,
            nodes,
            focus: self.focus.clone(),
        }
    }
}

impl Default for RenderDriver {
    fn default() -> Self {
        Self::new()
    }
}
