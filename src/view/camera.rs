//! Orbit camera for the globe canvas.
//!
//! A perspective camera that always looks at a target point. It projects
//! world positions into a screen rectangle for the egui painter and
//! supports damped orbit dragging and scroll zoom.

use eframe::egui::{Pos2, Rect, Vec2};
use glam::{Quat, Vec3};

use crate::config::CameraConfig;

/// Radians of orbit per dragged pixel.
const ORBIT_SPEED: f32 = 0.005;

/// Fraction of orbit velocity kept per tick after the drag ends.
const DAMPING: f32 = 0.9;

/// Velocities below this are treated as stopped.
const MIN_VELOCITY: f32 = 1e-4;

/// Keeps the camera away from the poles so the up vector stays defined.
const MAX_PITCH: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    min_distance: f32,
    max_distance: f32,
    /// Pending (yaw, pitch) orbit velocity in radians per tick.
    velocity: Vec2,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from(&CameraConfig::default())
    }
}

impl From<&CameraConfig> for OrbitCamera {
    fn from(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from_array(config.initial_position),
            target: Vec3::ZERO,
            fov_y: config.fov_y_degrees.to_radians(),
            near: 0.1,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            velocity: Vec2::ZERO,
        }
    }
}

impl OrbitCamera {
    /// Unit vectors (forward, right, up) of the view.
    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize_or_zero();
        let mut right = forward.cross(Vec3::Y);
        if right.length_squared() < 1e-8 {
            right = Vec3::X;
        }
        let right = right.normalize();
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Focal length in pixels for a viewport of `rect`.
    fn focal_px(&self, rect: &Rect) -> f32 {
        (rect.height() / 2.0) / (self.fov_y / 2.0).tan()
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Projects a world point into `rect`, returning the screen position and
    /// view depth. Points behind the near plane are `None`.
    pub fn project_to_screen(&self, world: Vec3, rect: &Rect) -> Option<(Pos2, f32)> {
        let (forward, right, up) = self.basis();
        let rel = world - self.position;
        let depth = rel.dot(forward);
        if depth < self.near {
            return None;
        }

        let f = self.focal_px(rect);
        let center = rect.center();
        Some((
            Pos2::new(
                center.x + rel.dot(right) * f / depth,
                center.y - rel.dot(up) * f / depth,
            ),
            depth,
        ))
    }

    /// On-screen size in pixels of a world length seen at `depth`.
    pub fn world_size_to_screen(&self, size: f32, depth: f32, rect: &Rect) -> f32 {
        size * self.focal_px(rect) / depth.max(self.near)
    }

    /// Whether a point on a sphere around `center` faces the camera.
    pub fn is_front_facing(&self, point: Vec3, center: Vec3) -> bool {
        let normal = point - center;
        (self.position - point).dot(normal) > 0.0
    }

    /// Moves the camera a fraction `alpha` of the way to `destination` and
    /// looks back at the target.
    pub fn lerp_towards(&mut self, destination: Vec3, alpha: f32) {
        self.position = self.position.lerp(destination, alpha);
    }

    /// Adds drag motion (pixels) to the orbit velocity.
    pub fn orbit(&mut self, drag: Vec2) {
        self.velocity += drag * ORBIT_SPEED;
    }

    /// Zooms by a scroll delta, keeping the distance within limits.
    pub fn zoom(&mut self, scroll: f32) {
        let offset = self.position - self.target;
        let distance = (offset.length() * (-scroll * 0.002).exp())
            .clamp(self.min_distance, self.max_distance);
        self.position = self.target + offset.normalize_or_zero() * distance;
    }

    /// Applies and damps pending orbit velocity. Returns true while moving.
    pub fn tick(&mut self) -> bool {
        if self.velocity.length() < MIN_VELOCITY {
            self.velocity = Vec2::ZERO;
            return false;
        }

        let offset = self.position - self.target;
        let (_, right, _) = self.basis();

        let yaw = Quat::from_rotation_y(-self.velocity.x);
        let mut rotated = yaw * offset;

        let pitch_now = (rotated.y / rotated.length()).clamp(-1.0, 1.0).asin();
        let pitch_delta = (pitch_now + self.velocity.y).clamp(-MAX_PITCH, MAX_PITCH) - pitch_now;
        rotated = Quat::from_axis_angle(yaw * right, pitch_delta) * rotated;

        self.position = self.target + rotated;
        self.velocity *= DAMPING;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = OrbitCamera::default();
        let (pos, depth) = camera.project_to_screen(Vec3::ZERO, &viewport()).unwrap();
        assert!((pos.x - 400.0).abs() < 1e-3);
        assert!((pos.y - 300.0).abs() < 1e-3);
        assert!((depth - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_up_is_up_on_screen() {
        let camera = OrbitCamera::default();
        let (pos, _) = camera.project_to_screen(Vec3::Y, &viewport()).unwrap();
        assert!(pos.y < 300.0);
        let (pos, _) = camera.project_to_screen(Vec3::X, &viewport()).unwrap();
        assert!(pos.x > 400.0);
    }

    #[test]
    fn test_behind_camera_is_culled() {
        let camera = OrbitCamera::default();
        assert!(camera
            .project_to_screen(Vec3::new(0.0, 0.0, 10.0), &viewport())
            .is_none());
    }

    #[test]
    fn test_front_facing() {
        let camera = OrbitCamera::default();
        assert!(camera.is_front_facing(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO));
        assert!(!camera.is_front_facing(Vec3::new(0.0, 0.0, -2.0), Vec3::ZERO));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.zoom(100_000.0);
        assert!((camera.distance() - 2.5).abs() < 1e-4);
        camera.zoom(-100_000.0);
        assert!((camera.distance() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_orbit_keeps_distance_and_settles() {
        let mut camera = OrbitCamera::default();
        camera.orbit(Vec2::new(40.0, 10.0));

        let mut ticks = 0;
        while camera.tick() {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(ticks > 0);
        assert!((camera.distance() - 6.0).abs() < 1e-3);
        assert!(camera.position != Vec3::new(0.0, 0.0, 6.0));
    }
}
