//! Telemetry update coordinator.
//!
//! Fans each reading out to the overview gauge and to the matching globe
//! label. Readings are applied synchronously in the order they are handed
//! in, so the last delivered value is the one left on screen.

use chrono::{DateTime, Utc};
use eframe::egui::Color32;
use std::collections::HashMap;

use super::types::{TelemetryEvent, TelemetryReading};
use crate::config::TelemetryConfig;
use crate::label::{make_label, LabelRegistry, LabelStyle, TextMeasure};

/// Connection status of the feed as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedStatus {
    #[default]
    Idle,
    Connecting,
    Live,
    Error(String),
}

impl FeedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FeedStatus::Idle => "Idle",
            FeedStatus::Connecting => "CONNECTING",
            FeedStatus::Live => "LIVE",
            FeedStatus::Error(_) => "ERROR",
        }
    }

    pub fn color(&self) -> Color32 {
        match self {
            FeedStatus::Idle => Color32::from_rgb(100, 100, 100),
            FeedStatus::Connecting => Color32::from_rgb(255, 180, 50),
            FeedStatus::Live => Color32::from_rgb(80, 220, 120),
            FeedStatus::Error(_) => Color32::from_rgb(255, 50, 50),
        }
    }
}

/// Text and fill of a gauge on the overview slide.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryGauge {
    pub text: String,
    /// Fill level in [0, 100].
    pub fill_percent: f32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TelemetryGauge {
    /// Filled part of the bar.
    pub const FILL: Color32 = Color32::from_rgb(233, 211, 2);
    /// Empty part of the bar.
    pub const EMPTY: Color32 = Color32::from_rgb(221, 249, 255);

    fn placeholder(prefix: &str) -> Self {
        Self {
            text: format!("{}: --", prefix),
            fill_percent: 0.0,
            updated_at: None,
        }
    }
}

/// Routes one feed field to a gauge and a globe label.
#[derive(Debug, Clone)]
pub struct TelemetryBinding {
    pub field: String,
    pub gauge_prefix: String,
    pub label_entity: Option<String>,
    pub label_prefix: String,
}

impl TelemetryBinding {
    /// Text shown on the globe before the first reading arrives.
    pub fn placeholder_label(&self) -> String {
        format!("{}: --", self.label_prefix)
    }
}

impl From<&TelemetryConfig> for TelemetryBinding {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            field: config.value_field.clone(),
            gauge_prefix: config.gauge_prefix.clone(),
            label_entity: Some(config.label_entity.clone()),
            label_prefix: config.label_prefix.clone(),
        }
    }
}

/// Applies telemetry readings to gauges and labels.
pub struct TelemetryCoordinator {
    bindings: Vec<TelemetryBinding>,
    gauges: HashMap<String, TelemetryGauge>,
    style: LabelStyle,
    status: FeedStatus,
    /// Label updates dropped because the label did not exist yet.
    dropped: usize,
    readings: usize,
}

impl TelemetryCoordinator {
    pub fn new(bindings: Vec<TelemetryBinding>, style: LabelStyle) -> Self {
        let gauges = bindings
            .iter()
            .map(|b| (b.field.clone(), TelemetryGauge::placeholder(&b.gauge_prefix)))
            .collect();
        Self {
            bindings,
            gauges,
            style,
            status: FeedStatus::Idle,
            dropped: 0,
            readings: 0,
        }
    }

    pub fn bindings(&self) -> &[TelemetryBinding] {
        &self.bindings
    }

    pub fn gauge(&self, field: &str) -> Option<&TelemetryGauge> {
        self.gauges.get(field)
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: FeedStatus) {
        self.status = status;
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn reading_count(&self) -> usize {
        self.readings
    }

    /// Handles one feed event.
    pub fn handle_event(
        &mut self,
        event: TelemetryEvent,
        labels: &mut LabelRegistry,
        measure: &dyn TextMeasure,
    ) {
        match event {
            TelemetryEvent::Subscribed => {
                log::info!("Telemetry subscription active");
                self.status = FeedStatus::Live;
            }
            TelemetryEvent::Reading(reading) => {
                if self.status != FeedStatus::Live {
                    self.status = FeedStatus::Live;
                }
                self.handle(&reading, labels, measure);
            }
            TelemetryEvent::Error(msg) => {
                log::warn!("Telemetry feed error: {}", msg);
                self.status = FeedStatus::Error(msg);
            }
        }
    }

    /// Applies a reading to every binding of its field.
    ///
    /// The gauge text keeps the raw value; only the fill is clamped. If the
    /// bound label does not exist yet the label update is dropped and the
    /// next reading will carry the current value.
    pub fn handle(
        &mut self,
        reading: &TelemetryReading,
        labels: &mut LabelRegistry,
        measure: &dyn TextMeasure,
    ) {
        self.readings += 1;

        for binding in self.bindings.iter().filter(|b| b.field == reading.field) {
            let gauge = self
                .gauges
                .entry(binding.field.clone())
                .or_insert_with(|| TelemetryGauge::placeholder(&binding.gauge_prefix));
            gauge.text = format!("{}: {}%", binding.gauge_prefix, reading.value);
            if let Some(percent) = reading.value.as_percent() {
                gauge.fill_percent = percent;
            }
            gauge.updated_at = Some(reading.received_at);

            let Some(entity) = binding.label_entity.as_deref() else {
                continue;
            };
            if !labels.contains(entity) {
                self.dropped += 1;
                log::debug!(
                    "Dropping telemetry label update for {}: label not created yet",
                    entity
                );
                continue;
            }

            let text = format!("{}: {}%", binding.label_prefix, reading.value);
            let visual = make_label(&text, &self.style, measure);
            if let Err(e) = labels.set_label(entity, visual, None) {
                log::warn!("{}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::FixedMeasure;
    use crate::telemetry::types::TelemetryValue;
    use glam::Vec3;

    fn coordinator() -> TelemetryCoordinator {
        TelemetryCoordinator::new(
            vec![TelemetryBinding::from(&TelemetryConfig::default())],
            LabelStyle::default(),
        )
    }

    fn reading(value: f64) -> TelemetryReading {
        TelemetryReading::new("Value", TelemetryValue::Number(value))
    }

    #[test]
    fn test_gauge_text_and_fill() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();
        assert_eq!(coord.gauge("Value").unwrap().text, "Urine: --");

        coord.handle(&reading(42.0), &mut labels, &FixedMeasure(0.5));

        let gauge = coord.gauge("Value").unwrap();
        assert_eq!(gauge.text, "Urine: 42%");
        assert_eq!(gauge.fill_percent, 42.0);
        assert!(gauge.updated_at.is_some());
    }

    #[test]
    fn test_out_of_range_fill_is_clamped() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();

        coord.handle(&reading(150.0), &mut labels, &FixedMeasure(0.5));

        let gauge = coord.gauge("Value").unwrap();
        assert_eq!(gauge.fill_percent, 100.0);
        assert_eq!(gauge.text, "Urine: 150%");
    }

    #[test]
    fn test_later_reading_wins() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();
        let placeholder = make_label("ISS: --", &LabelStyle::default(), &FixedMeasure(0.5));
        labels.set_label("ISS", placeholder, Some(Vec3::Y)).unwrap();

        coord.handle(&reading(10.0), &mut labels, &FixedMeasure(0.5));
        coord.handle(&reading(20.0), &mut labels, &FixedMeasure(0.5));

        assert_eq!(coord.gauge("Value").unwrap().text, "Urine: 20%");
        assert_eq!(labels.get("ISS").unwrap().0.text(), "ISS: 20%");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.released_count(), 2);
    }

    #[test]
    fn test_label_update_dropped_before_label_exists() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();

        coord.handle(&reading(30.0), &mut labels, &FixedMeasure(0.5));

        assert_eq!(coord.dropped_count(), 1);
        assert!(labels.is_empty());
        // The gauge still updates
        assert_eq!(coord.gauge("Value").unwrap().text, "Urine: 30%");
    }

    #[test]
    fn test_text_value_keeps_previous_fill() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();

        coord.handle(&reading(60.0), &mut labels, &FixedMeasure(0.5));
        coord.handle(
            &TelemetryReading::new("Value", TelemetryValue::Text("n/a".into())),
            &mut labels,
            &FixedMeasure(0.5),
        );

        let gauge = coord.gauge("Value").unwrap();
        assert_eq!(gauge.text, "Urine: n/a%");
        assert_eq!(gauge.fill_percent, 60.0);
    }

    #[test]
    fn test_other_fields_ignored() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();

        coord.handle(
            &TelemetryReading::new("TimeStamp", TelemetryValue::Number(1.0)),
            &mut labels,
            &FixedMeasure(0.5),
        );

        assert_eq!(coord.gauge("Value").unwrap().text, "Urine: --");
        assert_eq!(coord.reading_count(), 1);
    }

    #[test]
    fn test_status_transitions() {
        let mut coord = coordinator();
        let mut labels = LabelRegistry::new();
        assert_eq!(coord.status(), &FeedStatus::Idle);

        coord.handle_event(TelemetryEvent::Subscribed, &mut labels, &FixedMeasure(0.5));
        assert_eq!(coord.status(), &FeedStatus::Live);

        coord.handle_event(
            TelemetryEvent::Error("closed".into()),
            &mut labels,
            &FixedMeasure(0.5),
        );
        assert_eq!(coord.status().label(), "ERROR");
    }
}
