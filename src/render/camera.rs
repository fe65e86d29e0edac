// Orbit camera with perspective projection
//
// The camera orbits a target point. Autopan hops between recently active
// nodes with smooth fly-to transitions and falls back to framing the whole
// graph when nothing is active.

use super::layout::{ForceLayout, Vec3};
use crate::graph::{ActivityTracker, NodeId};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Vertical field of view
const FOV_RADIANS: f64 = PI / 3.0;
const NEAR_PLANE: f64 = 0.5;

/// Duration of a fly-to transition
pub const FLY_MS: i64 = 2_400;

/// Nodes active within this window are autopan candidates
pub const AUTOPAN_ACTIVITY_WINDOW_MS: i64 = 60_000;

const ORBIT_DISTANCE: std::ops::RangeInclusive<f64> = 22.0..=38.0;
const ORBIT_PITCH: std::ops::RangeInclusive<f64> = -0.5..=0.9;
const FIT_MARGIN: f64 = 1.3;
const MIN_DISTANCE: f64 = 20.0;

/// Idle rotation speed around the target
const DRIFT_RADIANS_PER_SEC: f64 = 0.04;

/// Where the camera looks from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub target: Vec3,
    pub distance: f64,
    /// Rotation around the vertical axis
    pub yaw: f64,
    /// Elevation above the horizontal plane
    pub pitch: f64,
}

impl Pose {
    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset * self.distance
    }

    /// Interpolate, turning the short way around
    pub fn lerp(&self, to: &Pose, t: f64) -> Pose {
        let yaw_delta = (to.yaw - self.yaw + PI).rem_euclid(TAU) - PI;
        Pose {
            target: self.target.lerp(to.target, t),
            distance: self.distance + (to.distance - self.distance) * t,
            yaw: self.yaw + yaw_delta * t,
            pitch: self.pitch + (to.pitch - self.pitch) * t,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 60.0,
            yaw: 0.0,
            pitch: 0.35,
        }
    }
}

/// A point in normalized view coordinates
///
/// `x`/`y` are in units of the vertical half-extent: visible `y` spans -1..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
    /// Distance along the view direction
    pub depth: f64,
    /// World-to-screen scale at this depth
    pub scale: f64,
}

#[derive(Debug, Clone, Copy)]
struct Flight {
    from: Pose,
    to: Pose,
    started: i64,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pose: Pose,
    flight: Option<Flight>,
    focal: f64,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            pose: Pose::default(),
            flight: None,
            focal: 1.0 / (FOV_RADIANS / 2.0).tan(),
        }
    }

    #[cfg(test)]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    #[cfg(test)]
    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    /// Start a smooth transition from the current pose
    pub fn fly_to(&mut self, to: Pose, now: i64) {
        self.flight = Some(Flight {
            from: self.pose,
            to,
            started: now,
        });
    }

    /// Advance the transition, or drift around the target when idle
    pub fn update(&mut self, now: i64, dt: f64, drift: bool) {
        if let Some(flight) = self.flight {
            let t = ((now - flight.started) as f64 / FLY_MS as f64).clamp(0.0, 1.0);
            self.pose = flight.from.lerp(&flight.to, ease_in_out_cubic(t));
            if t >= 1.0 {
                self.flight = None;
            }
        } else if drift {
            self.pose.yaw = (self.pose.yaw + DRIFT_RADIANS_PER_SEC * dt).rem_euclid(TAU);
        }
    }

    /// Perspective projection; `None` for points behind the near plane
    pub fn project(&self, point: Vec3) -> Option<Projected> {
        let eye = self.pose.eye();
        let forward = (self.pose.target - eye).normalized();
        let mut right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalized();
        if right == Vec3::ZERO {
            right = Vec3::new(1.0, 0.0, 0.0);
        }
        let up = right.cross(forward);

        let rel = point - eye;
        let depth = rel.dot(forward);
        if depth < NEAR_PLANE {
            return None;
        }
        let scale = self.focal / depth;
        Some(Projected {
            x: rel.dot(right) * scale,
            y: rel.dot(up) * scale,
            depth,
            scale,
        })
    }

    /// Pose that frames a sphere, keeping the current viewing angle
    pub fn fit_pose(&self, center: Vec3, radius: f64) -> Pose {
        let distance = (radius * FIT_MARGIN * self.focal).max(MIN_DISTANCE);
        Pose {
            target: center,
            distance,
            ..self.pose
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Orbit around `target` from a random spherical offset
pub fn orbit_pose<R: Rng>(target: Vec3, rng: &mut R) -> Pose {
    Pose {
        target,
        distance: rng.random_range(ORBIT_DISTANCE),
        yaw: rng.random_range(0.0..TAU),
        pitch: rng.random_range(ORBIT_PITCH),
    }
}

/// Next autopan destination
///
/// Picks a random recently active node that has a layout position. With no
/// such node, frames the whole graph. Returns `None` for an empty layout.
pub fn autopan_pose<R: Rng>(
    camera: &Camera,
    tracker: &ActivityTracker,
    layout: &ForceLayout,
    now: i64,
    rng: &mut R,
) -> Option<(Pose, Option<NodeId>)> {
    let candidates: Vec<(NodeId, Vec3)> = tracker
        .recently_active(now, AUTOPAN_ACTIVITY_WINDOW_MS)
        .into_iter()
        .filter_map(|(id, _)| layout.position(&id).map(|pos| (id, pos)))
        .collect();

    if let Some((id, position)) = candidates.choose(rng) {
        let (id, position) = (id.clone(), *position);
        return Some((orbit_pose(position, rng), Some(id)));
    }

    layout
        .bounds()
        .map(|(center, radius)| (camera.fit_pose(center, radius), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn level_camera() -> Camera {
        let mut camera = Camera::new();
        camera.pose = Pose {
            target: Vec3::ZERO,
            distance: 10.0,
            yaw: 0.0,
            pitch: 0.0,
        };
        camera
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = level_camera();
        let p = camera.project(Vec3::ZERO).unwrap();
        assert!(approx(p.x, 0.0) && approx(p.y, 0.0));
        assert!(approx(p.depth, 10.0));
    }

    #[test]
    fn test_projection_orientation() {
        let camera = level_camera();
        let right = camera.project(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let up = camera.project(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(right.x > 0.0 && approx(right.y, 0.0));
        assert!(up.y > 0.0 && approx(up.x, 0.0));

        // Farther points shrink
        let far = camera.project(Vec3::new(1.0, 0.0, -10.0)).unwrap();
        assert!(far.x < right.x);
        assert!(far.scale < right.scale);
    }

    #[test]
    fn test_points_behind_camera_are_culled() {
        let camera = level_camera();
        assert!(camera.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
    }

    #[test]
    fn test_fly_to_reaches_destination() {
        let mut camera = Camera::new();
        let to = Pose {
            target: Vec3::new(5.0, 5.0, 5.0),
            distance: 25.0,
            yaw: 1.0,
            pitch: 0.2,
        };
        camera.fly_to(to, 1_000);
        camera.update(1_000 + FLY_MS / 2, 0.0, false);
        assert!(camera.is_flying());
        assert_ne!(camera.pose(), to);

        camera.update(1_000 + FLY_MS, 0.0, false);
        assert!(!camera.is_flying());
        let pose = camera.pose();
        assert!((pose.target - to.target).length() < 1e-9);
        assert!(approx(pose.distance, 25.0));
    }

    #[test]
    fn test_yaw_turns_the_short_way() {
        let a = Pose {
            yaw: 0.1,
            ..Pose::default()
        };
        let b = Pose {
            yaw: TAU - 0.1,
            ..Pose::default()
        };
        let mid = a.lerp(&b, 0.5);
        assert!(mid.yaw.abs() < 1e-9);
    }

    #[test]
    fn test_drift_only_when_idle() {
        let mut camera = Camera::new();
        let yaw = camera.pose().yaw;
        camera.update(0, 1.0, false);
        assert!(approx(camera.pose().yaw, yaw));
        camera.update(0, 1.0, true);
        assert!(camera.pose().yaw > yaw);
    }

    #[test]
    fn test_autopan_prefers_active_nodes() {
        let mut rng = StdRng::seed_from_u64(3);
        let camera = Camera::new();
        let mut layout = ForceLayout::new();
        let mut tracker = ActivityTracker::new();

        assert!(autopan_pose(&camera, &tracker, &layout, 0, &mut rng).is_none());

        layout.ensure("a", 0);
        layout.ensure("b", 0);
        layout.ensure("idle", 0);

        // Nothing active yet: fit everything
        let (pose, focus) = autopan_pose(&camera, &tracker, &layout, 0, &mut rng).unwrap();
        assert!(focus.is_none());
        assert!(pose.distance >= MIN_DISTANCE);

        tracker.record(&Edge::new("a", "b", 10_000), 10_000);
        let (pose, focus) = autopan_pose(&camera, &tracker, &layout, 12_000, &mut rng).unwrap();
        let focus = focus.unwrap();
        assert!(focus == "a" || focus == "b");
        assert_eq!(pose.target, layout.position(&focus).unwrap());
        assert!(ORBIT_DISTANCE.contains(&pose.distance));

        // Activity aged out: back to fit-all
        let later = 10_000 + AUTOPAN_ACTIVITY_WINDOW_MS + 1;
        let (_, focus) = autopan_pose(&camera, &tracker, &layout, later, &mut rng).unwrap();
        assert!(focus.is_none());
    }
}
