//! Central canvas: the rotating globe with pins, labels and the ISS.

use crate::geo::CITIES;
use crate::state::AppState;
use crate::view::OrbitCamera;
use eframe::egui::{self, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, Vec2};
use glam::{Quat, Vec3};

const BACKGROUND: Color32 = Color32::from_rgb(5, 8, 20);
const OCEAN: Color32 = Color32::from_rgb(18, 60, 110);
const GRATICULE: Color32 = Color32::from_rgba_premultiplied(120, 170, 220, 60);
const PIN: Color32 = Color32::from_rgb(255, 0, 0);
const ISS_COLOR: Color32 = Color32::from_rgb(220, 220, 230);

/// Pin sphere radius in world units.
const PIN_RADIUS: f32 = 0.05;
/// ISS marker half-size in world units.
const ISS_SIZE: f32 = 0.06;
/// Degrees between graticule lines.
const GRATICULE_STEP: i32 = 30;

pub fn render_globe(ctx: &egui::Context, state: &mut AppState) {
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(BACKGROUND))
        .show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
            let rect = response.rect;

            handle_interaction(ui, &response, state);

            let earth = state.earth_transform();
            let radius = state.config.globe.earth_radius;

            draw_earth(&painter, &rect, &state.camera, radius);
            draw_graticule(&painter, &rect, &state.camera, earth, radius);
            draw_pins(&painter, &rect, state, radius);
            draw_iss(&painter, &rect, &state.camera, state.iss_position(), radius);
            draw_labels(ui.ctx(), &painter, &rect, state, earth, radius);
            draw_overlay_info(&painter, &rect, state);
        });
}

fn handle_interaction(ui: &egui::Ui, response: &egui::Response, state: &mut AppState) {
    if response.dragged() {
        state.camera.orbit(response.drag_delta());
        state.view_sync.cancel();
    }

    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            state.camera.zoom(scroll);
            state.view_sync.cancel();
        }
    }
}

/// Whether the segment from the camera to `point` passes through a sphere
/// of `radius` at the origin before reaching the point.
pub(crate) fn occluded_by_sphere(camera: Vec3, point: Vec3, radius: f32) -> bool {
    let to_point = point - camera;
    let distance = to_point.length();
    if distance <= f32::EPSILON {
        return false;
    }
    let dir = to_point / distance;

    // Ray/sphere intersection: |camera + t * dir|^2 = radius^2
    let b = camera.dot(dir);
    let c = camera.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return false;
    }
    let t_near = -b - disc.sqrt();
    t_near > 0.0 && t_near < distance - 1e-4
}

fn draw_earth(painter: &Painter, rect: &Rect, camera: &OrbitCamera, radius: f32) {
    let Some((center, depth)) = camera.project_to_screen(Vec3::ZERO, rect) else {
        return;
    };
    let distance = camera.distance();
    if distance <= radius {
        return;
    }

    // Silhouette of a sphere: tangent rays subtend asin(r / d)
    let apparent = radius * distance / (distance * distance - radius * radius).sqrt();
    let screen_radius = camera.world_size_to_screen(apparent, depth, rect);

    painter.circle_filled(center, screen_radius, OCEAN);
    painter.circle_stroke(
        center,
        screen_radius,
        Stroke::new(1.5, Color32::from_rgb(90, 150, 210)),
    );
}

fn draw_graticule(painter: &Painter, rect: &Rect, camera: &OrbitCamera, earth: Quat, radius: f32) {
    let stroke = Stroke::new(1.0, GRATICULE);
    let on_sphere = |lat: f64, lon: f64| earth * crate::geo::project(lat, lon, radius);

    let polyline = |points: Vec<Vec3>| {
        for pair in points.windows(2) {
            if !camera.is_front_facing(pair[0], Vec3::ZERO)
                || !camera.is_front_facing(pair[1], Vec3::ZERO)
            {
                continue;
            }
            if let (Some((a, _)), Some((b, _))) = (
                camera.project_to_screen(pair[0], rect),
                camera.project_to_screen(pair[1], rect),
            ) {
                painter.line_segment([a, b], stroke);
            }
        }
    };

    // Parallels
    for lat in (-90 + GRATICULE_STEP..90).step_by(GRATICULE_STEP as usize) {
        polyline(
            (-180..=180)
                .step_by(5)
                .map(|lon| on_sphere(lat as f64, lon as f64))
                .collect(),
        );
    }

    // Meridians
    for lon in (-180..180).step_by(GRATICULE_STEP as usize) {
        polyline(
            (-90..=90)
                .step_by(5)
                .map(|lat| on_sphere(lat as f64, lon as f64))
                .collect(),
        );
    }
}

fn draw_pins(painter: &Painter, rect: &Rect, state: &AppState, radius: f32) {
    for city in CITIES {
        let Some(local) = state.positions.lookup(city.name) else {
            continue;
        };
        let world = state.world_position(city.name, local);
        if !state.camera.is_front_facing(world, Vec3::ZERO)
            || occluded_by_sphere(state.camera.position, world, radius)
        {
            continue;
        }
        if let Some((pos, depth)) = state.camera.project_to_screen(world, rect) {
            let r = state.camera.world_size_to_screen(PIN_RADIUS, depth, rect);
            painter.circle_filled(pos, r.max(1.5), PIN);
        }
    }
}

fn draw_iss(painter: &Painter, rect: &Rect, camera: &OrbitCamera, iss: Vec3, radius: f32) {
    if occluded_by_sphere(camera.position, iss, radius) {
        return;
    }
    let Some((pos, depth)) = camera.project_to_screen(iss, rect) else {
        return;
    };

    let half = camera.world_size_to_screen(ISS_SIZE, depth, rect).max(2.0);
    // Truss with two solar wings
    painter.line_segment(
        [pos - Vec2::new(half * 2.0, 0.0), pos + Vec2::new(half * 2.0, 0.0)],
        Stroke::new(1.5, ISS_COLOR),
    );
    for side in [-1.0, 1.0] {
        let wing = Rect::from_center_size(
            pos + Vec2::new(side * half * 1.6, 0.0),
            Vec2::new(half * 0.6, half * 1.6),
        );
        painter.rect_filled(wing, 0.0, Color32::from_rgb(60, 90, 160));
    }
    painter.circle_filled(pos, half * 0.5, ISS_COLOR);
}

fn draw_labels(
    ctx: &egui::Context,
    painter: &Painter,
    rect: &Rect,
    state: &mut AppState,
    earth: Quat,
    radius: f32,
) {
    if state.labels.is_empty() {
        return;
    }
    let camera = state.camera.clone();

    let mut visible: Vec<_> = state
        .labels
        .iter_mut()
        .filter_map(|(entity, stored, visual)| {
            let world = if AppState::is_earth_attached(entity) {
                earth * stored
            } else {
                stored
            };
            if occluded_by_sphere(camera.position, world, radius) {
                return None;
            }
            let (pos, depth) = camera.project_to_screen(world, rect)?;
            Some((pos, depth, visual))
        })
        .collect();

    // Painter's algorithm: far labels first
    visible.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (pos, depth, visual) in visible {
        let scale = visual.scale();
        let size = Vec2::new(
            camera.world_size_to_screen(scale.x, depth, rect),
            camera.world_size_to_screen(scale.y, depth, rect),
        );
        if size.x < 2.0 || size.y < 2.0 {
            continue;
        }

        let quad = Rect::from_center_size(pos, size);
        if let Some(texture) = visual.texture_id(ctx) {
            painter.image(
                texture,
                quad,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let text_scale = size.x / visual.size_px()[0] as f32;
        painter.text(
            quad.center(),
            egui::Align2::CENTER_CENTER,
            visual.text(),
            FontId::proportional(visual.font_size() * text_scale),
            visual.text_color(),
        );
    }
}

fn draw_overlay_info(painter: &Painter, rect: &Rect, state: &AppState) {
    let text = format!(
        "Labels: {}  Released: {}  Dropped updates: {}",
        state.labels.len(),
        state.labels.released_count(),
        state.telemetry.dropped_count()
    );
    painter.text(
        rect.left_bottom() + Vec2::new(10.0, -10.0),
        egui::Align2::LEFT_BOTTOM,
        text,
        FontId::monospace(11.0),
        Color32::from_rgb(200, 200, 220),
    );
    painter.text(
        rect.right_bottom() + Vec2::new(-10.0, -10.0),
        egui::Align2::RIGHT_BOTTOM,
        "Drag to orbit, scroll to zoom",
        FontId::proportional(11.0),
        Color32::GRAY,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_behind_sphere_is_occluded() {
        let camera = Vec3::new(0.0, 0.0, 6.0);
        assert!(occluded_by_sphere(camera, Vec3::new(0.0, 0.0, -2.2), 2.0));
    }

    #[test]
    fn test_point_in_front_is_visible() {
        let camera = Vec3::new(0.0, 0.0, 6.0);
        assert!(!occluded_by_sphere(camera, Vec3::new(0.0, 0.0, 2.2), 2.0));
        // Exactly on the surface facing the camera
        assert!(!occluded_by_sphere(camera, Vec3::new(0.0, 0.0, 2.0), 2.0));
    }

    #[test]
    fn test_point_beside_sphere_is_visible() {
        let camera = Vec3::new(0.0, 0.0, 6.0);
        assert!(!occluded_by_sphere(camera, Vec3::new(3.0, 0.0, -2.0), 2.0));
    }
}
