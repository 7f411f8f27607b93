//! UI modules for the Globe Deck application.
//!
//! The UI is split into distinct panels:
//! - Top bar: Title, feed status, and settings
//! - Left panel: Slide carousel with the telemetry overview and city weather
//! - Central canvas: The globe with labels and the ISS

mod carousel;
mod globe;
mod top_bar;

pub use carousel::{render_carousel, CarouselState};
pub use globe::render_globe;
pub use top_bar::{render_top_bar, TopBarAction};
