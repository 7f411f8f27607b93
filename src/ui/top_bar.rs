//! Top bar UI: app title, feed status, and the settings window.

use crate::state::AppState;
use crate::telemetry::FeedStatus;
use eframe::egui::{self, Color32, RichText};

/// Requests from the top bar that the app loop carries out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    /// Drop the current telemetry subscription and subscribe again.
    Reconnect,
    /// Re-fetch weather for every city.
    RefreshWeather,
}

pub fn render_top_bar(ctx: &egui::Context, state: &mut AppState) -> Option<TopBarAction> {
    let mut action = None;

    egui::TopBottomPanel::top("top_bar")
        .exact_height(36.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(
                    RichText::new(format!("{} Globe Deck", egui_phosphor::regular::GLOBE))
                        .strong()
                        .size(16.0)
                        .color(Color32::WHITE),
                );

                ui.separator();

                // Feed indicator
                let status = state.telemetry.status().clone();
                ui.label(
                    RichText::new(egui_phosphor::regular::BROADCAST)
                        .size(14.0)
                        .color(status.color()),
                );
                let indicator = ui.label(
                    RichText::new(status.label())
                        .monospace()
                        .size(12.0)
                        .color(status.color()),
                );
                if let FeedStatus::Error(msg) = &status {
                    indicator.on_hover_text(msg);
                }

                if matches!(status, FeedStatus::Error(_) | FeedStatus::Idle)
                    && ui
                        .small_button(egui_phosphor::regular::ARROWS_CLOCKWISE)
                        .on_hover_text("Reconnect telemetry")
                        .clicked()
                {
                    action = Some(TopBarAction::Reconnect);
                }

                ui.separator();

                ui.label(
                    RichText::new(&state.status_message)
                        .size(13.0)
                        .color(Color32::GRAY),
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .selectable_label(
                            state.settings_open,
                            RichText::new(egui_phosphor::regular::GEAR).size(16.0),
                        )
                        .on_hover_text("Settings")
                        .clicked()
                    {
                        state.settings_open = !state.settings_open;
                    }
                });
            });
        });

    if state.settings_open {
        if let Some(a) = render_settings_window(ctx, state) {
            action = Some(a);
        }
    }

    action
}

fn render_settings_window(ctx: &egui::Context, state: &mut AppState) -> Option<TopBarAction> {
    let mut action = None;
    let mut open = state.settings_open;

    egui::Window::new("Settings")
        .open(&mut open)
        .resizable(false)
        .collapsible(false)
        .show(ctx, |ui| {
            ui.label(RichText::new("Weather").strong());
            egui::Grid::new("weather_settings")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("API key:");
                    ui.add(
                        egui::TextEdit::singleline(&mut state.config.weather.api_key)
                            .password(true)
                            .desired_width(220.0),
                    );
                    ui.end_row();

                    ui.label("Refresh (s):");
                    ui.add(
                        egui::DragValue::new(&mut state.config.weather.refresh_secs)
                            .range(0..=3600),
                    )
                    .on_hover_text("0 disables periodic refresh");
                    ui.end_row();
                });

            ui.add_space(8.0);
            ui.label(RichText::new("Telemetry").strong());
            ui.label(
                RichText::new(format!(
                    "{:?} · {} / {}",
                    state.config.telemetry.source,
                    state.config.telemetry.item,
                    state.config.telemetry.value_field
                ))
                .monospace()
                .size(11.0)
                .color(Color32::GRAY),
            );

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    state.config.save();
                    state.status_message = "Settings saved".to_string();
                }
                if ui.button("Refresh weather").clicked() {
                    action = Some(TopBarAction::RefreshWeather);
                }
            });
        });

    state.settings_open = open;
    action
}
