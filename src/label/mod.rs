//! Globe labels.
//!
//! This module provides:
//! - A factory that builds text label visuals sized to their text
//! - A registry that owns the attached label per entity and swaps labels
//!   without leaking or double-attaching visuals

mod factory;
mod registry;

pub use factory::{make_label, LabelStyle, LabelVisual, PainterMeasure, TextMeasure};
pub use registry::{LabelError, LabelRegistry, LabelTicket};

#[cfg(test)]
pub(crate) use factory::tests::FixedMeasure;
