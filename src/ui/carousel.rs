//! Slide carousel: telemetry overview and one slide per city.

use crate::geo::CITIES;
use crate::state::AppState;
use crate::telemetry::TelemetryGauge;
use eframe::egui::{self, Color32, CornerRadius, RichText, Sense, Vec2};

/// Slide position with loop wrap-around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselState {
    index: usize,
    slide_count: usize,
}

impl CarouselState {
    pub fn new(slide_count: usize) -> Self {
        Self {
            index: 0,
            slide_count: slide_count.max(1),
        }
    }

    /// Current zero-based slide index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    /// Jumps to `index`. Returns the new index if it changed.
    pub fn go_to(&mut self, index: usize) -> Option<usize> {
        let index = index % self.slide_count;
        if index == self.index {
            return None;
        }
        self.index = index;
        Some(index)
    }

    pub fn next(&mut self) -> Option<usize> {
        self.go_to(self.index + 1)
    }

    pub fn prev(&mut self) -> Option<usize> {
        self.go_to(self.index + self.slide_count - 1)
    }
}

/// Renders the carousel panel and forwards index changes to the camera.
pub fn render_carousel(ctx: &egui::Context, state: &mut AppState) {
    let mut changed = None;

    egui::SidePanel::left("carousel")
        .resizable(false)
        .exact_width(280.0)
        .show(ctx, |ui| {
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui
                    .button(RichText::new(egui_phosphor::regular::CARET_LEFT).size(18.0))
                    .clicked()
                {
                    changed = state.carousel.prev();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button(RichText::new(egui_phosphor::regular::CARET_RIGHT).size(18.0))
                        .clicked()
                    {
                        changed = state.carousel.next();
                    }
                });
            });

            ui.separator();
            ui.add_space(8.0);

            match state.carousel.index() {
                0 => render_overview_slide(ui, state),
                i => render_city_slide(ui, state, i - 1),
            }

            ui.add_space(16.0);
            if let Some(index) = render_pagination(ui, &state.carousel) {
                changed = state.carousel.go_to(index).or(changed);
            }
        });

    if let Some(index) = changed {
        log::debug!("Carousel moved to slide {}", index);
        state.on_slide_change(index);
    }
}

fn render_overview_slide(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("ISS live");
    ui.add_space(8.0);

    let field = &state.config.telemetry.value_field;
    let Some(gauge) = state.telemetry.gauge(field) else {
        return;
    };

    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), 32.0), Sense::hover());
    let painter = ui.painter_at(rect);
    let split = rect.left() + rect.width() * gauge.fill_percent / 100.0;

    painter.rect_filled(rect, CornerRadius::same(4), TelemetryGauge::EMPTY);
    let mut filled = rect;
    filled.set_right(split);
    painter.rect_filled(filled, CornerRadius::same(4), TelemetryGauge::FILL);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        &gauge.text,
        egui::FontId::proportional(15.0),
        Color32::from_rgb(2, 48, 71),
    );

    ui.add_space(4.0);
    if let Some(updated) = gauge.updated_at {
        ui.label(
            RichText::new(format!("Updated {}", updated.format("%H:%M:%S UTC")))
                .size(11.0)
                .color(Color32::GRAY),
        );
    }
}

fn render_city_slide(ui: &mut egui::Ui, state: &AppState, city_index: usize) {
    let Some(city) = CITIES.get(city_index) else {
        return;
    };

    ui.heading(city.name);
    ui.label(
        RichText::new(format!(
            "{:.4}°, {:.4}°",
            city.latitude(),
            city.longitude()
        ))
        .monospace()
        .size(11.0)
        .color(Color32::GRAY),
    );
    ui.add_space(12.0);

    let text = state
        .weather_texts
        .get(city.name)
        .map(String::as_str)
        .unwrap_or("...");
    ui.label(
        RichText::new(format!("{} {}", egui_phosphor::regular::THERMOMETER, text))
            .size(22.0)
            .color(Color32::WHITE),
    );
}

/// Clickable dots, one per slide. Returns the clicked index.
fn render_pagination(ui: &mut egui::Ui, carousel: &CarouselState) -> Option<usize> {
    let mut clicked = None;
    ui.horizontal(|ui| {
        for i in 0..carousel.slide_count() {
            let (rect, response) = ui.allocate_exact_size(Vec2::splat(14.0), Sense::click());
            let color = if i == carousel.index() {
                Color32::WHITE
            } else {
                Color32::from_gray(90)
            };
            ui.painter().circle_filled(rect.center(), 4.0, color);
            if response.clicked() {
                clicked = Some(i);
            }
        }
    });
    clicked
}
