// 3D force-directed layout
//
// Damped Euler simulation with many-body charge, link springs,
// collision and a weak pull to the origin. Charge and collision radius both
// scale with degree so hubs push the crowd away and claim more room.
// The simulation never fully cools: a kiosk wall keeps drifting gently and
// reheats whenever the graph changes.

use super::decor::node_radius;
use crate::graph::{GraphStore, NodeId};
use rand::Rng;
use std::collections::HashMap;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Base repulsion of an isolated node
const CHARGE_BASE: f64 = 14.0;
/// Extra repulsion per incident edge
const CHARGE_PER_DEGREE: f64 = 3.0;
/// Degree beyond which charge stops growing
const CHARGE_DEGREE_CAP: usize = 40;
/// Pairs farther apart than this ignore each other's charge
const CHARGE_CUTOFF: f64 = 80.0;

const LINK_DISTANCE: f64 = 7.0;
const LINK_STRENGTH: f64 = 0.12;

const COLLISION_PADDING: f64 = 0.6;
const COLLISION_STRENGTH: f64 = 0.7;

const CENTERING: f64 = 0.015;
const VELOCITY_DECAY: f64 = 0.4;
const MAX_SPEED: f64 = 2.5;

const ALPHA_DECAY: f64 = 0.0228;
const ALPHA_MIN: f64 = 0.05;
const ALPHA_REHEAT: f64 = 0.5;

/// Spawn offset around an anchor, per axis
pub const SPAWN_JITTER: f64 = 2.0;
const SPAWN_SPEED: f64 = 0.3;
const SPIRAL_SPACING: f64 = 3.0;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector, or zero for a zero-length input
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > f64::EPSILON {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

/// Simulation state of one node
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    /// When the node entered the layout, drives the intro animation
    pub spawned_at: i64,
}

/// Repulsion strength for a node of the given degree
pub fn charge_strength(degree: usize) -> f64 {
    CHARGE_BASE + CHARGE_PER_DEGREE * degree.min(CHARGE_DEGREE_CAP) as f64
}

/// Collision radius for a node of the given degree
pub fn collision_radius(degree: usize) -> f64 {
    node_radius(degree) + COLLISION_PADDING
}

#[derive(Debug, Clone)]
pub struct ForceLayout {
    bodies: HashMap<NodeId, Body>,
    alpha: f64,
    spiral_index: usize,
}

impl ForceLayout {
    pub fn new() -> Self {
        Self {
            bodies: HashMap::new(),
            alpha: 1.0,
            spiral_index: 0,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.bodies.get(id).map(|body| body.position)
    }

    #[cfg(test)]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(ALPHA_REHEAT);
    }

    /// Place a new node next to `anchor` with a small outward push
    ///
    /// No-op if the node is already laid out.
    pub fn spawn_near<R: Rng>(
        &mut self,
        id: &str,
        anchor: Vec3,
        now: i64,
        rng: &mut R,
    ) -> bool {
        if self.bodies.contains_key(id) {
            return false;
        }
        let offset = Vec3::new(
            rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER),
            rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER),
            rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER),
        );
        let velocity = offset.normalized() * SPAWN_SPEED;
        self.bodies.insert(
            id.to_string(),
            Body {
                position: anchor + offset,
                velocity,
                spawned_at: now,
            },
        );
        self.reheat();
        true
    }

    /// Place a node with no known neighbor position on the spiral
    pub fn ensure(&mut self, id: &str, now: i64) -> bool {
        if self.bodies.contains_key(id) {
            return false;
        }
        let position = spiral_position(self.spiral_index);
        self.spiral_index += 1;
        self.bodies.insert(
            id.to_string(),
            Body {
                position,
                velocity: Vec3::ZERO,
                spawned_at: now,
            },
        );
        self.reheat();
        true
    }

    /// Make sure every stored node has a body
    pub fn sync(&mut self, store: &GraphStore, now: i64) -> usize {
        let mut added = 0;
        for node in store.nodes() {
            if self.ensure(&node.id, now) {
                added += 1;
            }
        }
        added
    }

    /// Centroid of all bodies and the largest distance from it
    pub fn bounds(&self) -> Option<(Vec3, f64)> {
        if self.bodies.is_empty() {
            return None;
        }
        let sum = self
            .bodies
            .values()
            .fold(Vec3::ZERO, |acc, body| acc + body.position);
        let center = sum * (1.0 / self.bodies.len() as f64);
        let radius = self
            .bodies
            .values()
            .map(|body| (body.position - center).length())
            .fold(0.0, f64::max);
        Some((center, radius))
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, store: &GraphStore, dt: f64) {
        if self.bodies.is_empty() {
            return;
        }
        let time_scale = (dt * 60.0).clamp(0.0, 3.0);
        if time_scale == 0.0 {
            return;
        }

        let mut ids: Vec<NodeId> = self.bodies.keys().cloned().collect();
        ids.sort();
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let positions: Vec<Vec3> = ids.iter().map(|id| self.bodies[id].position).collect();
        let degrees: Vec<usize> = ids.iter().map(|id| store.degree(id)).collect();
        let alpha = self.alpha;

        let mut forces = vec![Vec3::ZERO; ids.len()];

        // Charge and collision
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let mut delta = positions[i] - positions[j];
                let mut dist2 = delta.length_squared();
                if dist2 > CHARGE_CUTOFF * CHARGE_CUTOFF {
                    continue;
                }
                if dist2 < 1e-6 {
                    // Coincident bodies: separate along a fixed axis
                    delta = Vec3::new(0.01 * (1 + i % 3) as f64, 0.01, -0.01);
                    dist2 = delta.length_squared();
                }
                let dist2_clamped = dist2.max(1.0);
                forces[i] += delta * (charge_strength(degrees[j]) * alpha / dist2_clamped);
                forces[j] -= delta * (charge_strength(degrees[i]) * alpha / dist2_clamped);

                let dist = dist2.sqrt();
                let reach = collision_radius(degrees[i]) + collision_radius(degrees[j]);
                if dist < reach {
                    let push = delta * ((reach - dist) / dist * 0.5 * COLLISION_STRENGTH);
                    forces[i] += push;
                    forces[j] -= push;
                }
            }
        }

        // Springs, one per connected pair
        for (id, neighbors) in &store.derived().neighbors {
            let Some(&s) = index.get(id.as_str()) else {
                continue;
            };
            for other in neighbors {
                if other <= id {
                    continue;
                }
                let Some(&t) = index.get(other.as_str()) else {
                    continue;
                };
                let delta = positions[t] - positions[s];
                let dist = delta.length().max(0.01);
                let pull = delta * ((dist - LINK_DISTANCE) / dist * LINK_STRENGTH * alpha * 0.5);
                forces[s] += pull;
                forces[t] -= pull;
            }
        }

        for (i, id) in ids.iter().enumerate() {
            forces[i] -= positions[i] * (CENTERING * alpha);
            let Some(body) = self.bodies.get_mut(id) else {
                continue;
            };
            let mut velocity = (body.velocity + forces[i]) * (1.0 - VELOCITY_DECAY);
            let speed = velocity.length();
            if speed > MAX_SPEED {
                velocity = velocity * (MAX_SPEED / speed);
            }
            body.velocity = velocity;
            body.position += velocity * time_scale;
        }

        self.alpha = (self.alpha * (1.0 - ALPHA_DECAY * time_scale)).max(ALPHA_MIN);
    }
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic placement on an expanding Fibonacci sphere
pub fn spiral_position(index: usize) -> Vec3 {
    let k = index as f64;
    let radius = SPIRAL_SPACING * (k + 1.0).cbrt();
    let y = 1.0 - 2.0 * ((k * 0.618_034) % 1.0);
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = k * GOLDEN_ANGLE;
    Vec3::new(theta.cos() * ring, y, theta.sin() * ring) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store_with(edges: &[(&str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        for (i, (a, b)) in edges.iter().enumerate() {
            store.upsert_node(Node::new(*a, *a));
            store.upsert_node(Node::new(*b, *b));
            store.add_edge(Edge::new(*a, *b, i as i64 * 10_000));
        }
        store
    }

    fn distance(layout: &ForceLayout, a: &str, b: &str) -> f64 {
        (layout.position(a).unwrap() - layout.position(b).unwrap()).length()
    }

    #[test]
    fn test_charge_and_collision_grow_with_degree() {
        assert!(charge_strength(10) > charge_strength(1));
        assert!(collision_radius(10) > collision_radius(0));
        assert_eq!(
            charge_strength(CHARGE_DEGREE_CAP),
            charge_strength(CHARGE_DEGREE_CAP + 100)
        );
    }

    #[test]
    fn test_spiral_positions_are_distinct() {
        let points: Vec<Vec3> = (0..50).map(spiral_position).collect();
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                assert!((points[i] - points[j]).length() > 0.1);
            }
        }
    }

    #[test]
    fn test_spawn_near_stays_close_to_anchor() {
        let mut layout = ForceLayout::new();
        let mut rng = StdRng::seed_from_u64(7);
        let anchor = Vec3::new(10.0, -4.0, 3.0);

        assert!(layout.spawn_near("n", anchor, 1_000, &mut rng));
        let body = layout.body("n").unwrap();
        let offset = body.position - anchor;
        assert!(offset.x.abs() <= SPAWN_JITTER);
        assert!(offset.y.abs() <= SPAWN_JITTER);
        assert!(offset.z.abs() <= SPAWN_JITTER);
        assert!(body.velocity.length() <= SPAWN_SPEED + 1e-9);
        assert_eq!(body.spawned_at, 1_000);

        // Already placed nodes are left alone
        assert!(!layout.spawn_near("n", Vec3::ZERO, 2_000, &mut rng));
        assert_eq!(layout.body("n").unwrap().spawned_at, 1_000);
    }

    #[test]
    fn test_sync_places_every_node_once() {
        let store = store_with(&[("a", "b"), ("b", "c")]);
        let mut layout = ForceLayout::new();
        assert_eq!(layout.sync(&store, 0), 3);
        assert_eq!(layout.sync(&store, 0), 0);
        assert_eq!(layout.len(), 3);
    }

    #[test]
    fn test_linked_nodes_end_closer_than_unlinked() {
        let mut store = store_with(&[("a", "b")]);
        store.upsert_node(Node::new("c", "c"));
        let mut layout = ForceLayout::new();
        layout.sync(&store, 0);

        for _ in 0..600 {
            layout.step(&store, 1.0 / 30.0);
        }
        assert!(distance(&layout, "a", "b") < distance(&layout, "a", "c"));
        assert!(distance(&layout, "a", "b") < distance(&layout, "b", "c"));
    }

    #[test]
    fn test_overlapping_nodes_separate() {
        let store = store_with(&[]);
        let mut layout = ForceLayout::new();
        let mut rng = StdRng::seed_from_u64(1);
        layout.spawn_near("a", Vec3::ZERO, 0, &mut rng);
        layout.spawn_near("b", Vec3::ZERO, 0, &mut rng);
        let before = distance(&layout, "a", "b");

        for _ in 0..60 {
            layout.step(&store, 1.0 / 30.0);
        }
        assert!(distance(&layout, "a", "b") > before);
        assert!(distance(&layout, "a", "b") >= collision_radius(0));
    }

    #[test]
    fn test_alpha_cools_but_never_stops() {
        let store = store_with(&[("a", "b")]);
        let mut layout = ForceLayout::new();
        layout.sync(&store, 0);
        for _ in 0..2_000 {
            layout.step(&store, 1.0 / 30.0);
        }
        assert!((layout.alpha() - ALPHA_MIN).abs() < 1e-9);

        layout.ensure("late", 0);
        assert!(layout.alpha() >= ALPHA_REHEAT);
    }

    #[test]
    fn test_bounds_cover_all_bodies() {
        let store = store_with(&[("a", "b"), ("c", "d")]);
        let mut layout = ForceLayout::new();
        layout.sync(&store, 0);
        let (center, radius) = layout.bounds().unwrap();
        for id in ["a", "b", "c", "d"] {
            assert!((layout.position(id).unwrap() - center).length() <= radius + 1e-9);
        }
        assert!(ForceLayout::new().bounds().is_none());
    }
}
