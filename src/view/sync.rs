//! Carousel to camera synchronization.
//!
//! Maps the carousel's slide index to a city and eases the camera toward
//! a vantage point above that city's recorded position.

use glam::Vec3;

use super::camera::OrbitCamera;
use crate::config::CameraConfig;
use crate::geo::{PositionRegistry, CITIES};

/// Camera positions closer than this to the destination count as arrived.
const ARRIVAL_EPSILON: f32 = 1e-3;

/// Drives the camera from carousel index changes.
///
/// Each index change applies one smoothing step immediately; the same step
/// is then repeated on every animation tick until the camera arrives or the
/// user takes over with the mouse.
pub struct ViewSync {
    /// Slide index -> entity name. Slide 0 is the telemetry overview.
    table: Vec<Option<String>>,
    distance_factor: f32,
    smoothing: f32,
    destination: Option<Vec3>,
}

impl ViewSync {
    pub fn new(config: &CameraConfig) -> Self {
        let table = std::iter::once(None)
            .chain(CITIES.iter().map(|c| Some(c.name.to_string())))
            .collect();
        Self::with_table(table, config)
    }

    pub fn with_table(table: Vec<Option<String>>, config: &CameraConfig) -> Self {
        Self {
            table,
            distance_factor: config.distance_factor,
            smoothing: config.smoothing,
            destination: None,
        }
    }

    /// Entity shown on slide `index`, if any.
    pub fn target_for_index(&self, index: usize) -> Option<&str> {
        self.table.get(index).and_then(|t| t.as_deref())
    }

    /// Where the camera is currently heading.
    #[cfg(test)]
    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    /// Reacts to a carousel transition. Returns true if the camera moved.
    ///
    /// Slides without an entity, or entities without a recorded position,
    /// leave the camera untouched.
    pub fn on_index_change(
        &mut self,
        index: usize,
        positions: &PositionRegistry,
        camera: &mut OrbitCamera,
    ) -> bool {
        let Some(entity) = self.target_for_index(index) else {
            return false;
        };
        if positions.is_empty() {
            log::debug!("No positions recorded yet, camera unchanged");
            return false;
        }
        let Some(position) = positions.lookup(entity) else {
            log::debug!("No recorded position for {}, camera unchanged", entity);
            return false;
        };

        let destination = position * self.distance_factor;
        log::debug!("Slide {} -> {}: camera heading to {:?}", index, entity, destination);
        self.destination = Some(destination);
        self.step(camera, self.smoothing);
        true
    }

    /// Continues toward the destination over `ticks` animation ticks.
    /// Returns true while still moving.
    ///
    /// The per-tick smoothing is compounded, so one call with `n` ticks
    /// lands where `n` single-tick calls would.
    pub fn tick(&mut self, camera: &mut OrbitCamera, ticks: f32) -> bool {
        if self.destination.is_none() || ticks <= 0.0 {
            return self.destination.is_some();
        }
        let alpha = 1.0 - (1.0 - self.smoothing).powf(ticks);
        self.step(camera, alpha);
        self.destination.is_some()
    }

    /// Drops the pending destination (user interaction).
    pub fn cancel(&mut self) {
        if self.destination.take().is_some() {
            log::debug!("Camera sync cancelled");
        }
    }

    fn step(&mut self, camera: &mut OrbitCamera, alpha: f32) {
        let Some(destination) = self.destination else {
            return;
        };
        camera.lerp_towards(destination, alpha.clamp(0.0, 1.0));
        camera.target = Vec3::ZERO;
        if camera.position.distance(destination) < ARRIVAL_EPSILON {
            camera.position = destination;
            self.destination = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::project;

    fn setup() -> (ViewSync, PositionRegistry, OrbitCamera) {
        let config = CameraConfig::default();
        (
            ViewSync::new(&config),
            PositionRegistry::new(),
            OrbitCamera::from(&config),
        )
    }

    #[test]
    fn test_index_table() {
        let (sync, _, _) = setup();
        assert_eq!(sync.target_for_index(0), None);
        assert_eq!(sync.target_for_index(1), Some("Paris"));
        assert_eq!(sync.target_for_index(3), Some("Tokyo"));
        assert_eq!(sync.target_for_index(5), Some("Sydney"));
        assert_eq!(sync.target_for_index(6), None);
    }

    #[test]
    fn test_unrecorded_city_is_noop() {
        let (mut sync, positions, mut camera) = setup();
        let before = camera.position;

        assert!(!sync.on_index_change(3, &positions, &mut camera));
        assert_eq!(camera.position, before);
        assert!(sync.destination().is_none());
    }

    #[test]
    fn test_overview_slide_is_noop() {
        let (mut sync, mut positions, mut camera) = setup();
        positions.record("Paris", project(48.8566, 2.3522, 2.01));
        let before = camera.position;

        assert!(!sync.on_index_change(0, &positions, &mut camera));
        assert_eq!(camera.position, before);
    }

    #[test]
    fn test_single_nudge_on_change() {
        let (mut sync, mut positions, mut camera) = setup();
        let tokyo = project(35.6895, 139.6917, 2.01);
        positions.record("Tokyo", tokyo);
        let start = camera.position;

        assert!(sync.on_index_change(3, &positions, &mut camera));

        let expected = start.lerp(tokyo * 3.0, 0.1);
        assert!((camera.position - expected).length() < 1e-5);
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(sync.destination(), Some(tokyo * 3.0));
    }

    #[test]
    fn test_ticks_converge() {
        let (mut sync, mut positions, mut camera) = setup();
        let sydney = project(-33.8688, 151.2093, 2.01);
        positions.record("Sydney", sydney);

        sync.on_index_change(5, &positions, &mut camera);
        let mut ticks = 0;
        while sync.tick(&mut camera, 1.0) {
            ticks += 1;
            assert!(ticks < 500);
        }
        assert_eq!(camera.position, sydney * 3.0);
        assert!(!sync.tick(&mut camera, 1.0));
    }

    #[test]
    fn test_cancel_stops_motion() {
        let (mut sync, mut positions, mut camera) = setup();
        positions.record("Paris", project(48.8566, 2.3522, 2.01));

        sync.on_index_change(1, &positions, &mut camera);
        sync.cancel();
        let held = camera.position;

        assert!(!sync.tick(&mut camera, 1.0));
        assert_eq!(camera.position, held);
    }

    #[test]
    fn test_easing_is_frame_rate_independent() {
        let (mut fast, mut positions, mut camera_fast) = setup();
        let (mut slow, _, mut camera_slow) = setup();
        positions.record("Tokyo", project(35.6895, 139.6917, 2.01));

        fast.on_index_change(3, &positions, &mut camera_fast);
        slow.on_index_change(3, &positions, &mut camera_slow);

        // 120 Hz display: two half-tick frames per 60 Hz frame
        for _ in 0..20 {
            fast.tick(&mut camera_fast, 0.5);
            fast.tick(&mut camera_fast, 0.5);
            slow.tick(&mut camera_slow, 1.0);
        }
        assert!((camera_fast.position - camera_slow.position).length() < 1e-4);
    }

    #[test]
    fn test_zero_ticks_does_not_move() {
        let (mut sync, mut positions, mut camera) = setup();
        positions.record("Paris", project(48.8566, 2.3522, 2.01));

        sync.on_index_change(1, &positions, &mut camera);
        let held = camera.position;

        assert!(sync.tick(&mut camera, 0.0));
        assert_eq!(camera.position, held);
    }
}
