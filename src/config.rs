//! Application configuration.
//!
//! On WASM, settings are persisted to localStorage so they survive page
//! reloads. Natively they are read from the JSON file named by the
//! `GLOBE_DECK_CONFIG` environment variable.

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The configuration source could not be read.
    Io(String),
    /// The configuration could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config read failed: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Weather lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key.
    pub api_key: String,
    /// Current-weather endpoint.
    pub base_url: String,
    /// Shown when the service answered without a temperature.
    pub no_data_text: String,
    /// Shown when the request itself failed.
    pub fetch_failed_text: String,
    /// Re-fetch interval in seconds (0 disables refresh).
    pub refresh_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            no_data_text: "No data \u{274c}".to_string(),
            fetch_failed_text: "Fetch failed \u{26a0}".to_string(),
            refresh_secs: 0,
        }
    }
}

/// Where telemetry readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetrySourceKind {
    /// Live ISS feed through the Lightstreamer client library (WASM only).
    Lightstreamer,
    /// Locally generated readings.
    Demo,
}

/// Telemetry feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub source: TelemetrySourceKind,
    pub server_url: String,
    pub adapter_set: String,
    pub item: String,
    /// Field carrying the tank level.
    pub value_field: String,
    pub timestamp_field: String,
    /// Prefix of the gauge text on the overview slide.
    pub gauge_prefix: String,
    /// Label entity on the globe that mirrors the value.
    pub label_entity: String,
    /// Prefix of the globe label text.
    pub label_prefix: String,
    /// Interval between demo readings.
    pub demo_interval_ms: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: if cfg!(target_arch = "wasm32") {
                TelemetrySourceKind::Lightstreamer
            } else {
                TelemetrySourceKind::Demo
            },
            server_url: "https://push.lightstreamer.com".to_string(),
            adapter_set: "ISSLIVE".to_string(),
            item: "NODE3000005".to_string(),
            value_field: "Value".to_string(),
            timestamp_field: "TimeStamp".to_string(),
            gauge_prefix: "Urine".to_string(),
            label_entity: "ISS".to_string(),
            label_prefix: "ISS".to_string(),
            demo_interval_ms: 2000,
        }
    }
}

/// Globe geometry and motion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub earth_radius: f32,
    /// Radius at which city pins are placed.
    pub city_radius: f32,
    /// City labels sit at `position * label_lift`.
    pub label_lift: f32,
    /// Earth rotation per animation tick (radians).
    pub spin_per_tick: f32,
    pub iss_orbit_radius: f32,
    pub iss_orbit_altitude: f32,
    /// ISS orbit advance per animation tick (radians).
    pub iss_orbit_speed: f32,
    /// Vertical offset of the ISS label above the station.
    pub iss_label_offset: f32,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            earth_radius: 2.0,
            city_radius: 2.01,
            label_lift: 1.1,
            spin_per_tick: 0.001,
            iss_orbit_radius: 2.5,
            iss_orbit_altitude: 1.3,
            iss_orbit_speed: 0.001,
            iss_label_offset: 0.5,
        }
    }
}

/// Label rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub font_size: f32,
    /// Total horizontal padding around the text, in pixels.
    pub padding: f32,
    pub background: [u8; 3],
    pub text_color: [u8; 3],
    /// Label image pixels per world unit.
    pub pixels_per_unit: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            padding: 8.0,
            background: [0x02, 0x30, 0x47],
            text_color: [255, 255, 255],
            pixels_per_unit: 100.0,
        }
    }
}

impl LabelConfig {
    pub fn background_color(&self) -> Color32 {
        let [r, g, b] = self.background;
        Color32::from_rgb(r, g, b)
    }

    pub fn text_color32(&self) -> Color32 {
        let [r, g, b] = self.text_color;
        Color32::from_rgb(r, g, b)
    }
}

/// Camera framing and carousel sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub initial_position: [f32; 3],
    pub fov_y_degrees: f32,
    /// Target camera position is `city_position * distance_factor`.
    pub distance_factor: f32,
    /// Exponential smoothing factor per nudge.
    pub smoothing: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_position: [0.0, 0.0, 6.0],
            fov_y_degrees: 75.0,
            distance_factor: 3.0,
            smoothing: 0.1,
            min_distance: 2.5,
            max_distance: 20.0,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub weather: WeatherConfig,
    pub telemetry: TelemetryConfig,
    pub globe: GlobeConfig,
    pub labels: LabelConfig,
    pub camera: CameraConfig,
}

impl AppConfig {
    /// localStorage key for persisting settings.
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    const STORAGE_KEY: &'static str = "globe_deck_config";

    /// Environment variable naming a JSON config file (native only).
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    const CONFIG_ENV: &'static str = "GLOBE_DECK_CONFIG";

    /// Environment variable that overrides the weather API key (native only).
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    const API_KEY_ENV: &'static str = "OPENWEATHER_API_KEY";

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load settings from localStorage, falling back to defaults.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return Self::default(),
        };

        let storage = match window.local_storage() {
            Ok(Some(s)) => s,
            _ => return Self::default(),
        };

        let json = match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(s)) => s,
            _ => return Self::default(),
        };

        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("Loaded config from localStorage");
                config
            }
            Err(e) => {
                log::warn!("{}", e);
                Self::default()
            }
        }
    }

    /// Load settings from the file named by `GLOBE_DECK_CONFIG`, falling
    /// back to defaults. `OPENWEATHER_API_KEY` overrides the API key.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let mut config = match std::env::var(Self::CONFIG_ENV) {
            Ok(path) => match Self::load_file(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path);
                    config
                }
                Err(e) => {
                    log::warn!("{}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(key) = std::env::var(Self::API_KEY_ENV) {
            config.weather.api_key = key;
        }

        config
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn load_file(path: &str) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))?;
        Self::from_json(&json)
    }

    /// Save settings to localStorage.
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return,
        };

        let storage = match window.local_storage() {
            Ok(Some(s)) => s,
            _ => return,
        };

        let json = match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to serialize config: {}", e);
                return;
            }
        };

        if let Err(e) = storage.set_item(Self::STORAGE_KEY, &json) {
            log::warn!("Failed to save config: {:?}", e);
        } else {
            log::info!("Saved config to localStorage");
        }
    }

    /// Save settings to the file named by `GLOBE_DECK_CONFIG`, if set.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        let path = match std::env::var(Self::CONFIG_ENV) {
            Ok(p) => p,
            Err(_) => {
                log::debug!("{} not set, config not saved", Self::CONFIG_ENV);
                return;
            }
        };

        let json = match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to serialize config: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::write(&path, json) {
            log::warn!("Failed to save config to {}: {}", path, e);
        } else {
            log::info!("Saved config to {}", path);
        }
    }
}
