//! Telemetry reading types.

use chrono::{DateTime, Utc};

/// Raw value of a telemetry field.
///
/// The push feed delivers strings; numeric strings are parsed so that
/// proportional styling can use them.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Number(f64),
    Text(String),
}

impl TelemetryValue {
    /// Parses a raw feed string, keeping it as text when not numeric.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => TelemetryValue::Number(n),
            _ => TelemetryValue::Text(raw.to_string()),
        }
    }

    /// Value as a percentage clamped to [0, 100], if numeric.
    pub fn as_percent(&self) -> Option<f32> {
        match self {
            TelemetryValue::Number(n) => Some(n.clamp(0.0, 100.0) as f32),
            TelemetryValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryValue::Number(n) => write!(f, "{}", n),
            TelemetryValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One field update from the live feed.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub field: String,
    pub value: TelemetryValue,
    /// Source timestamp as sent by the feed, if any.
    pub timestamp: Option<f64>,
    /// Local receive time.
    pub received_at: DateTime<Utc>,
}

impl TelemetryReading {
    pub fn new(field: impl Into<String>, value: TelemetryValue) -> Self {
        Self {
            field: field.into(),
            value,
            timestamp: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<f64>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Events delivered by a telemetry feed, in delivery order.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Subscription handshake completed.
    Subscribed,
    /// A field update.
    Reading(TelemetryReading),
    /// The feed reported an error; the subscription may be gone.
    Error(String),
}
