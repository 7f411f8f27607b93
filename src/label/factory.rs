//! Text label visuals for the globe.
//!
//! A label is a small rounded plate image sized tightly around its text.
//! The plate is uploaded as an egui texture the first time it is painted
//! and the texture is freed when the label is released.

use eframe::egui::{self, Color32, ColorImage, FontId, TextureHandle, TextureId, TextureOptions};
use glam::Vec2;

use crate::config::LabelConfig;

/// Corner radius of the label plate in pixels.
const CORNER_RADIUS: f32 = 4.0;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.5;

/// Measures rendered text.
pub trait TextMeasure {
    /// Width in pixels of `text` laid out on a single line.
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Measures text with the fonts loaded into an egui painter.
pub struct PainterMeasure<'a> {
    painter: &'a egui::Painter,
}

impl<'a> PainterMeasure<'a> {
    pub fn new(painter: &'a egui::Painter) -> Self {
        Self { painter }
    }
}

impl TextMeasure for PainterMeasure<'_> {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.painter
            .layout_no_wrap(
                text.to_owned(),
                FontId::proportional(font_size),
                Color32::WHITE,
            )
            .size()
            .x
    }
}

/// Visual parameters shared by all labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub padding: f32,
    pub background: Color32,
    pub text_color: Color32,
    pub pixels_per_unit: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::from(&LabelConfig::default())
    }
}

impl From<&LabelConfig> for LabelStyle {
    fn from(config: &LabelConfig) -> Self {
        Self {
            font_size: config.font_size,
            padding: config.padding,
            background: config.background_color(),
            text_color: config.text_color32(),
            pixels_per_unit: config.pixels_per_unit,
        }
    }
}

/// A renderable text label.
///
/// Not `Clone`: each visual owns its plate texture, and the label registry
/// is the only place a visual is released.
pub struct LabelVisual {
    text: String,
    size_px: [usize; 2],
    scale: Vec2,
    font_size: f32,
    text_color: Color32,
    /// Plate pixels waiting for their first upload.
    image: Option<ColorImage>,
    /// Uploaded plate, freed on drop.
    texture: Option<TextureHandle>,
}

impl std::fmt::Debug for LabelVisual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelVisual")
            .field("text", &self.text)
            .field("size_px", &self.size_px)
            .field("uploaded", &self.is_uploaded())
            .finish()
    }
}

impl LabelVisual {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Plate size in pixels.
    pub fn size_px(&self) -> [usize; 2] {
        self.size_px
    }

    /// Plate size in world units.
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn text_color(&self) -> Color32 {
        self.text_color
    }

    pub fn is_uploaded(&self) -> bool {
        self.texture.is_some()
    }

    /// Returns the plate texture, uploading it on first use.
    pub fn texture_id(&mut self, ctx: &egui::Context) -> Option<TextureId> {
        if self.texture.is_none() {
            let image = self.image.take()?;
            self.texture = Some(ctx.load_texture(
                format!("label:{}", self.text),
                image,
                TextureOptions::LINEAR,
            ));
        }
        self.texture.as_ref().map(|t| t.id())
    }

    /// Releases the visual and its texture.
    pub(super) fn release(self) {
        log::debug!(
            "Releasing label '{}' (texture uploaded: {})",
            self.text,
            self.texture.is_some()
        );
    }
}

/// Builds a label for `text`.
///
/// The plate is `text width + padding` wide and `1.5 * font size` tall,
/// so an empty string yields a `padding`-wide minimum label.
pub fn make_label(text: &str, style: &LabelStyle, measure: &dyn TextMeasure) -> LabelVisual {
    let text_width = if text.is_empty() {
        0.0
    } else {
        measure.text_width(text, style.font_size).max(0.0)
    };

    let width = ((text_width + style.padding).ceil() as usize).max(1);
    let height = ((style.font_size * LINE_HEIGHT).ceil() as usize).max(1);

    let image = render_plate(width, height, style.background);
    let scale = Vec2::new(
        width as f32 / style.pixels_per_unit,
        height as f32 / style.pixels_per_unit,
    );

    LabelVisual {
        text: text.to_string(),
        size_px: [width, height],
        scale,
        font_size: style.font_size,
        text_color: style.text_color,
        image: Some(image),
        texture: None,
    }
}

/// Rasterizes a rounded plate filled with `background`.
fn render_plate(width: usize, height: usize, background: Color32) -> ColorImage {
    let mut pixels = vec![0u8; width * height * 4];
    let radius = CORNER_RADIUS.min(width as f32 / 2.0).min(height as f32 / 2.0);

    for y in 0..height {
        for x in 0..width {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            // Distance outside the rounded corner, if in a corner square
            let cx = px.clamp(radius, width as f32 - radius);
            let cy = py.clamp(radius, height as f32 - radius);
            let dist = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);

            let idx = (y * width + x) * 4;
            pixels[idx] = background.r();
            pixels[idx + 1] = background.g();
            pixels[idx + 2] = background.b();
            pixels[idx + 3] = (coverage * 255.0) as u8;
        }
    }

    ColorImage::from_rgba_unmultiplied([width, height], &pixels)
}
