#![warn(clippy::all)]

//! Globe Deck - A web-based globe dashboard.
//!
//! This application shows a rotating globe with city labels, a slide
//! carousel that flies the camera to each city and shows its current
//! weather, and a live ISS telemetry gauge mirrored onto a label that
//! follows the station around its orbit.

mod config;
mod geo;
mod label;
mod state;
mod telemetry;
mod ui;
mod view;
mod weather;

use config::AppConfig;
use eframe::egui;
use label::PainterMeasure;
use state::AppState;
use telemetry::{FeedStatus, TelemetryFeed};
use weather::WeatherChannel;

/// Animation ticks per second of wall time.
const TICKS_PER_SECOND: f32 = 60.0;

/// Upper bound on one frame's step so a stalled tab does not jump.
const MAX_FRAME_SECONDS: f32 = 0.1;

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Globe Deck",
        native_options,
        Box::new(|cc| Ok(Box::new(GlobeDeckApp::new(cc)))),
    )
}

// WASM entry point - main is not called on wasm32
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Entry point for the WASM application.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` messages to `console.log`:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("app_canvas")
            .expect("Failed to find app_canvas")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("app_canvas was not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(GlobeDeckApp::new(cc)))),
            )
            .await;

        // Remove the loading text once the app has loaded:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p>The app has crashed. See the developer console for details.</p>",
                    );
                    panic!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

/// Main application state and logic.
pub struct GlobeDeckApp {
    /// Application state containing registries, camera and UI state
    state: AppState,

    /// Channel for async weather lookups
    weather_channel: WeatherChannel,

    /// Live telemetry subscription
    telemetry_feed: TelemetryFeed,

    /// When weather was last requested for all cities
    last_weather_fetch: Option<web_time::Instant>,

    /// Monotonic instant of the previous frame
    last_frame: web_time::Instant,
}

impl GlobeDeckApp {
    /// Creates a new GlobeDeckApp instance.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let config = AppConfig::load();
        if config.weather.api_key.is_empty() {
            log::warn!("No weather API key configured; lookups will fail");
        }

        let mut state = AppState::new(config);
        let mut telemetry_feed = TelemetryFeed::new();
        telemetry_feed.subscribe(cc.egui_ctx.clone(), &state.config.telemetry);
        state.telemetry.set_status(FeedStatus::Connecting);

        Self {
            state,
            weather_channel: WeatherChannel::new(),
            telemetry_feed,
            last_weather_fetch: None,
            last_frame: web_time::Instant::now(),
        }
    }

    /// Requests weather for every city, each with a fresh label ticket.
    fn request_weather(&mut self, ctx: &egui::Context) {
        let tickets = self.state.reserve_weather_tickets();
        log::info!("Requesting weather for {} cities", tickets.len());
        for (city, ticket) in tickets {
            self.weather_channel
                .request(ctx.clone(), city, ticket, &self.state.config.weather);
        }
        self.last_weather_fetch = Some(web_time::Instant::now());
        self.state.status_message = "Fetching weather...".to_string();
    }

    fn weather_refresh_due(&self) -> bool {
        let refresh = self.state.config.weather.refresh_secs;
        match self.last_weather_fetch {
            Some(last) => refresh > 0 && last.elapsed().as_secs() >= refresh,
            None => false,
        }
    }

    fn reconnect_telemetry(&mut self, ctx: &egui::Context) {
        log::info!("Reconnecting telemetry feed");
        if self.telemetry_feed.is_active() {
            log::debug!("Replacing active telemetry subscription");
        }
        self.telemetry_feed.stop();
        self.telemetry_feed
            .subscribe(ctx.clone(), &self.state.config.telemetry);
        self.state.telemetry.set_status(FeedStatus::Connecting);
    }
}

impl eframe::App for GlobeDeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = web_time::Instant::now();
        let dt = now
            .duration_since(self.last_frame)
            .as_secs_f32()
            .min(MAX_FRAME_SECONDS);
        self.last_frame = now;

        // Label plates are sized with the loaded fonts, which exist once a
        // frame is running.
        let painter = ctx.layer_painter(egui::LayerId::background());
        let measure = PainterMeasure::new(&painter);

        if !self.state.labels_created {
            self.state.create_labels(&measure);
            self.request_weather(ctx);
        } else if self.weather_refresh_due() {
            self.request_weather(ctx);
        }

        // Check for completed weather lookups
        while let Some(result) = self.weather_channel.try_recv() {
            self.state.apply_weather(result, &measure);
            if self.weather_channel.in_flight() == 0 {
                self.state.status_message = "Weather updated".to_string();
            }
        }

        // Apply telemetry events in arrival order
        while let Some(event) = self.telemetry_feed.try_recv() {
            self.state
                .telemetry
                .handle_event(event, &mut self.state.labels, &measure);
        }

        self.state.advance(dt * TICKS_PER_SECOND);

        // Render UI panels in the correct order for egui layout
        // Side and top/bottom panels must be rendered before CentralPanel
        let action = ui::render_top_bar(ctx, &mut self.state);
        ui::render_carousel(ctx, &mut self.state);
        ui::render_globe(ctx, &mut self.state);

        match action {
            Some(ui::TopBarAction::Reconnect) => self.reconnect_telemetry(ctx),
            Some(ui::TopBarAction::RefreshWeather) => self.request_weather(ctx),
            None => {}
        }

        // The globe is always spinning
        ctx.request_repaint();
    }
}

impl Drop for GlobeDeckApp {
    fn drop(&mut self) {
        self.telemetry_feed.stop();
        self.state.labels.clear();
        log::info!(
            "Shut down after {} telemetry readings, {} labels released",
            self.state.telemetry.reading_count(),
            self.state.labels.released_count()
        );
    }
}
