//! Application state.
//!
//! `AppState` is the single context object built at startup and passed
//! explicitly to the UI and the coordinators. It owns the registries, the
//! camera and the animation clock; nothing lives in globals.

use glam::{Quat, Vec3};
use std::collections::HashMap;

use crate::config::AppConfig;
use crate::geo::{self, PositionRegistry, CITIES};
use crate::label::{make_label, LabelError, LabelRegistry, LabelStyle, LabelTicket, TextMeasure};
use crate::telemetry::{TelemetryBinding, TelemetryCoordinator};
use crate::ui::CarouselState;
use crate::view::{OrbitCamera, ViewSync};
use crate::weather::{self, WeatherResult};

/// Root application state.
pub struct AppState {
    pub config: AppConfig,

    /// Projected city positions (earth-local frame)
    pub positions: PositionRegistry,

    /// Attached globe labels
    pub labels: LabelRegistry,

    pub label_style: LabelStyle,

    pub camera: OrbitCamera,

    /// Carousel to camera sync
    pub view_sync: ViewSync,

    pub telemetry: TelemetryCoordinator,

    pub carousel: CarouselState,

    /// Weather text per city slide
    pub weather_texts: HashMap<String, String>,

    /// Ticket sequence of the newest weather result applied per city
    weather_applied: HashMap<String, u64>,

    /// Earth rotation about +Y (radians)
    pub earth_rotation: f32,

    /// ISS orbit angle (radians)
    pub iss_orbit_angle: f32,

    /// Whether the initial city and ISS labels exist yet
    pub labels_created: bool,

    /// Application status message displayed in top bar
    pub status_message: String,

    /// Whether the settings window is open
    pub settings_open: bool,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let mut positions = PositionRegistry::new();
        for city in CITIES {
            positions.record(city.name, geo::project_point(city, config.globe.city_radius));
        }
        log::info!("Recorded {} city positions", positions.len());

        let label_style = LabelStyle::from(&config.labels);
        let telemetry = TelemetryCoordinator::new(
            vec![TelemetryBinding::from(&config.telemetry)],
            label_style.clone(),
        );
        let weather_texts = CITIES
            .iter()
            .map(|c| (c.name.to_string(), "...".to_string()))
            .collect();

        Self {
            positions,
            labels: LabelRegistry::new(),
            label_style,
            camera: OrbitCamera::from(&config.camera),
            view_sync: ViewSync::new(&config.camera),
            telemetry,
            carousel: CarouselState::new(CITIES.len() + 1),
            weather_texts,
            weather_applied: HashMap::new(),
            earth_rotation: 0.0,
            iss_orbit_angle: 0.0,
            labels_created: false,
            status_message: "Ready".to_string(),
            settings_open: false,
            config,
        }
    }

    /// Rotation applied to everything attached to the earth.
    pub fn earth_transform(&self) -> Quat {
        Quat::from_rotation_y(self.earth_rotation)
    }

    /// Whether `entity` rides on the rotating earth.
    pub fn is_earth_attached(entity: &str) -> bool {
        geo::get_city(entity).is_some()
    }

    /// World position of a label or pin given its stored position.
    pub fn world_position(&self, entity: &str, stored: Vec3) -> Vec3 {
        if Self::is_earth_attached(entity) {
            self.earth_transform() * stored
        } else {
            stored
        }
    }

    /// Current ISS position in world space.
    pub fn iss_position(&self) -> Vec3 {
        let globe = &self.config.globe;
        Vec3::new(
            globe.iss_orbit_radius * self.iss_orbit_angle.cos(),
            globe.iss_orbit_altitude,
            globe.iss_orbit_radius * self.iss_orbit_angle.sin(),
        )
    }

    fn iss_label_position(&self) -> Vec3 {
        self.iss_position() + Vec3::Y * self.config.globe.iss_label_offset
    }

    /// Advances the animation by `ticks` frames' worth of motion.
    pub fn advance(&mut self, ticks: f32) {
        let globe = &self.config.globe;
        self.earth_rotation =
            (self.earth_rotation + globe.spin_per_tick * ticks) % std::f32::consts::TAU;
        self.iss_orbit_angle =
            (self.iss_orbit_angle + globe.iss_orbit_speed * ticks) % std::f32::consts::TAU;

        let label_pos = self.iss_label_position();
        let entity = self.config.telemetry.label_entity.clone();
        self.labels.move_label(&entity, label_pos);

        self.view_sync.tick(&mut self.camera, ticks);
        self.camera.tick();
    }

    /// Creates the city name labels and the ISS placeholder label.
    pub fn create_labels(&mut self, measure: &dyn TextMeasure) {
        if self.labels_created {
            return;
        }

        for city in CITIES {
            let Some(position) = self.positions.lookup(city.name) else {
                continue;
            };
            let visual = make_label(city.name, &self.label_style, measure);
            let lifted = position * self.config.globe.label_lift;
            if let Err(e) = self.labels.set_label(city.name, visual, Some(lifted)) {
                log::warn!("{}", e);
            }
        }

        let iss_pos = self.iss_label_position();
        for binding in self.telemetry.bindings() {
            let Some(entity) = binding.label_entity.as_deref() else {
                continue;
            };
            let visual = make_label(&binding.placeholder_label(), &self.label_style, measure);
            if let Err(e) = self.labels.set_label(entity, visual, Some(iss_pos)) {
                log::warn!("{}", e);
            }
        }

        self.labels_created = true;
        log::info!("Created {} globe labels", self.labels.len());
    }

    /// Reserves label tickets for a weather refresh of every city.
    pub fn reserve_weather_tickets(&mut self) -> Vec<(String, LabelTicket)> {
        CITIES
            .iter()
            .map(|c| (c.name.to_string(), self.labels.reserve(c.name)))
            .collect()
    }

    /// Applies a completed weather lookup to the slide text and the label.
    ///
    /// Results apply in request order: one whose ticket is not newer than
    /// the last applied result for the city is ignored, success or failure.
    pub fn apply_weather(&mut self, result: WeatherResult, measure: &dyn TextMeasure) {
        let seq = result.ticket.seq();
        let newest = self
            .weather_applied
            .entry(result.ticket.entity().to_string())
            .or_insert(0);
        if seq <= *newest {
            log::debug!(
                "Ignoring stale weather result for {} (ticket {}, current {})",
                result.ticket.entity(),
                seq,
                newest
            );
            return;
        }
        *newest = seq;

        let text = weather::weather_display_text(&result.outcome, &self.config.weather);
        self.weather_texts.insert(result.city.clone(), text);

        let Some(label_text) = weather::weather_label_text(&result.city, &result.outcome) else {
            return;
        };
        let visual = make_label(&label_text, &self.label_style, measure);
        match self.labels.set_label_ticketed(result.ticket, visual, None) {
            Ok(()) => {}
            Err(e @ LabelError::Stale { .. }) => log::debug!("{}", e),
            Err(e) => log::warn!("{}", e),
        }
    }

    /// Slide index change from the carousel.
    pub fn on_slide_change(&mut self, index: usize) {
        self.view_sync
            .on_index_change(index, &self.positions, &mut self.camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::FixedMeasure;
    use crate::weather::WeatherError;

    fn state_with_labels() -> AppState {
        let mut state = AppState::new(AppConfig::default());
        state.create_labels(&FixedMeasure(0.5));
        state
    }

    #[test]
    fn test_positions_recorded_at_startup() {
        let state = AppState::new(AppConfig::default());
        let paris = state.positions.lookup("Paris").unwrap();
        assert!((paris.length() - 2.01).abs() < 1e-4);
        assert_eq!(state.positions.len(), CITIES.len());
    }

    #[test]
    fn test_create_labels_once() {
        let mut state = state_with_labels();
        assert_eq!(state.labels.len(), CITIES.len() + 1);
        assert_eq!(state.labels.get("ISS").unwrap().0.text(), "ISS: --");

        state.create_labels(&FixedMeasure(0.5));
        assert_eq!(state.labels.released_count(), 0);

        let (_, pos) = state.labels.get("Tokyo").unwrap();
        assert!((pos.length() - 2.01 * 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_weather_success_updates_label() {
        let mut state = state_with_labels();
        let tickets = state.reserve_weather_tickets();
        let (city, ticket) = tickets.into_iter().find(|(c, _)| c == "Paris").unwrap();
        let before = state.labels.get("Paris").unwrap().1;

        state.apply_weather(
            WeatherResult {
                city,
                ticket,
                outcome: Ok(18.4),
            },
            &FixedMeasure(0.5),
        );

        let (visual, pos) = state.labels.get("Paris").unwrap();
        assert_eq!(visual.text(), "Paris: 18°C");
        assert_eq!(pos, before);
        assert_eq!(state.weather_texts["Paris"], "18°C");
    }

    #[test]
    fn test_weather_failure_keeps_label() {
        let mut state = state_with_labels();
        let ticket = state.labels.reserve("Tokyo");

        state.apply_weather(
            WeatherResult {
                city: "Tokyo".to_string(),
                ticket,
                outcome: Err(WeatherError::Transport("offline".into())),
            },
            &FixedMeasure(0.5),
        );

        assert_eq!(state.labels.get("Tokyo").unwrap().0.text(), "Tokyo");
        assert_eq!(
            state.weather_texts["Tokyo"],
            state.config.weather.fetch_failed_text
        );
    }

    fn weather(state: &mut AppState, ticket: LabelTicket, outcome: Result<f64, WeatherError>) {
        state.apply_weather(
            WeatherResult {
                city: ticket.entity().to_string(),
                ticket,
                outcome,
            },
            &FixedMeasure(0.5),
        );
    }

    #[test]
    fn test_out_of_order_weather_keeps_newest_everywhere() {
        let mut state = state_with_labels();
        let older = state.labels.reserve("Paris");
        let newer = state.labels.reserve("Paris");

        weather(&mut state, newer, Ok(19.0));
        weather(&mut state, older, Ok(12.0));

        assert_eq!(state.labels.get("Paris").unwrap().0.text(), "Paris: 19°C");
        assert_eq!(state.weather_texts["Paris"], "19°C");
    }

    #[test]
    fn test_stale_failure_does_not_replace_success() {
        let mut state = state_with_labels();
        let older = state.labels.reserve("Sydney");
        let newer = state.labels.reserve("Sydney");

        weather(&mut state, newer, Ok(24.0));
        weather(&mut state, older, Err(WeatherError::Transport("timeout".into())));

        assert_eq!(state.weather_texts["Sydney"], "24°C");
        assert_eq!(state.labels.get("Sydney").unwrap().0.text(), "Sydney: 24°C");
    }

    #[test]
    fn test_newer_failure_replaces_older_success_on_slide() {
        let mut state = state_with_labels();
        let older = state.labels.reserve("Tokyo");
        let newer = state.labels.reserve("Tokyo");

        weather(&mut state, older, Ok(22.0));
        weather(&mut state, newer, Err(WeatherError::NoData));

        assert_eq!(state.weather_texts["Tokyo"], state.config.weather.no_data_text);
    }

    #[test]
    fn test_advance_moves_iss_label() {
        let mut state = state_with_labels();
        let before = state.labels.get("ISS").unwrap().1;

        state.advance(100.0);

        let after = state.labels.get("ISS").unwrap().1;
        assert_ne!(before, after);
        assert!((after.y - 1.8).abs() < 1e-5);
        assert!((state.earth_rotation - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_city_world_position_rotates_with_earth() {
        let mut state = AppState::new(AppConfig::default());
        state.earth_rotation = std::f32::consts::FRAC_PI_2;

        let local = Vec3::X;
        let world = state.world_position("Paris", local);
        assert!((world - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert_eq!(state.world_position("ISS", local), local);
    }

    #[test]
    fn test_slide_change_moves_camera() {
        let mut state = AppState::new(AppConfig::default());
        let before = state.camera.position;

        state.on_slide_change(0);
        assert_eq!(state.camera.position, before);

        state.on_slide_change(2);
        assert_ne!(state.camera.position, before);
    }
}
