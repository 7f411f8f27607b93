//! City weather lookups.
//!
//! Uses channel-based communication to bridge async fetches with egui's
//! synchronous update loop. Each fetch is fire-and-forget; its result
//! carries the label ticket reserved when the request was made.

use eframe::egui;
use serde::Deserialize;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::config::WeatherConfig;
use crate::label::LabelTicket;

/// Why a temperature could not be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherError {
    /// The service answered but without a temperature.
    NoData,
    /// The request, HTTP exchange or body decoding failed.
    Transport(String),
}

impl std::fmt::Display for WeatherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherError::NoData => write!(f, "No temperature in weather response"),
            WeatherError::Transport(msg) => write!(f, "Weather request failed: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: Option<MainSection>,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: Option<f64>,
}

/// Extracts `main.temp` (Celsius) from an OpenWeatherMap response.
///
/// Error payloads such as `{"cod": "404", "message": "city not found"}`
/// have no `main` section and map to `NoData`; malformed JSON is a
/// transport failure.
pub fn parse_weather(json: &str) -> Result<f64, WeatherError> {
    let response: WeatherResponse =
        serde_json::from_str(json).map_err(|e| WeatherError::Transport(e.to_string()))?;
    response
        .main
        .and_then(|m| m.temp)
        .filter(|t| t.is_finite())
        .ok_or(WeatherError::NoData)
}

/// Text for the city's weather slide.
pub fn weather_display_text(outcome: &Result<f64, WeatherError>, config: &WeatherConfig) -> String {
    match outcome {
        Ok(temp) => format!("{}°C", temp.round() as i64),
        Err(WeatherError::NoData) => config.no_data_text.clone(),
        Err(WeatherError::Transport(_)) => config.fetch_failed_text.clone(),
    }
}

/// Text for the city's globe label, or `None` to keep the current label.
pub fn weather_label_text(city: &str, outcome: &Result<f64, WeatherError>) -> Option<String> {
    outcome
        .as_ref()
        .ok()
        .map(|temp| format!("{}: {}°C", city, temp.round() as i64))
}

/// Completed lookup.
#[derive(Debug)]
pub struct WeatherResult {
    pub city: String,
    pub ticket: LabelTicket,
    pub outcome: Result<f64, WeatherError>,
}

/// Channel-based weather fetcher.
pub struct WeatherChannel {
    sender: Sender<WeatherResult>,
    receiver: Receiver<WeatherResult>,
    in_flight: usize,
}

impl Default for WeatherChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherChannel {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Number of requests that have not reported back yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Spawns an async lookup for `city`.
    #[cfg(target_arch = "wasm32")]
    pub fn request(
        &mut self,
        ctx: egui::Context,
        city: String,
        ticket: LabelTicket,
        config: &WeatherConfig,
    ) {
        let sender = self.sender.clone();
        let url = request_url(config, &String::from(js_sys::encode_uri_component(&city)));
        self.in_flight += 1;

        wasm_bindgen_futures::spawn_local(async move {
            let outcome = fetch_temperature(&url).await;
            log_outcome(&city, &outcome);
            let _ = sender.send(WeatherResult {
                city,
                ticket,
                outcome,
            });
            ctx.request_repaint();
        });
    }

    /// Spawns a lookup for `city` on a worker thread.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn request(
        &mut self,
        ctx: egui::Context,
        city: String,
        ticket: LabelTicket,
        config: &WeatherConfig,
    ) {
        let sender = self.sender.clone();
        let url = request_url(config, &city.replace(' ', "%20"));
        self.in_flight += 1;

        std::thread::spawn(move || {
            let outcome = fetch_temperature(&url);
            log_outcome(&city, &outcome);
            let _ = sender.send(WeatherResult {
                city,
                ticket,
                outcome,
            });
            ctx.request_repaint();
        });
    }

    /// Non-blocking check for a completed lookup.
    pub fn try_recv(&mut self) -> Option<WeatherResult> {
        let result = self.receiver.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(result)
    }
}

fn request_url(config: &WeatherConfig, encoded_city: &str) -> String {
    format!(
        "{}?q={}&appid={}&units=metric",
        config.base_url, encoded_city, config.api_key
    )
}

fn log_outcome(city: &str, outcome: &Result<f64, WeatherError>) {
    match outcome {
        Ok(temp) => log::info!("Weather for {}: {:.1}°C", city, temp),
        Err(e) => log::warn!("Weather for {}: {}", city, e),
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_temperature(url: &str) -> Result<f64, WeatherError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or(WeatherError::Transport("No window".to_string()))?;

    let opts = web_sys::RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(web_sys::RequestMode::Cors);

    let request = web_sys::Request::new_with_str_and_init(url, &opts)
        .map_err(|e| WeatherError::Transport(format!("{:?}", e)))?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| WeatherError::Transport(format!("{:?}", e)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|e| WeatherError::Transport(format!("{:?}", e)))?;

    let text = response
        .text()
        .map_err(|e| WeatherError::Transport(format!("{:?}", e)))?;
    let text = JsFuture::from(text)
        .await
        .map_err(|e| WeatherError::Transport(format!("{:?}", e)))?;
    let body = text
        .as_string()
        .ok_or(WeatherError::Transport("Response body is not text".to_string()))?;

    parse_weather(&body)
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_temperature(url: &str) -> Result<f64, WeatherError> {
    let body = reqwest::blocking::get(url)
        .and_then(|response| response.text())
        .map_err(|e| WeatherError::Transport(e.to_string()))?;
    parse_weather(&body)
}
