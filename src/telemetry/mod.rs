//! Live telemetry integration.
//!
//! This module provides functionality for:
//! - Subscribing to the ISS push feed (or a local demo generator)
//! - Delivering readings through a single-consumer channel
//! - Applying readings to the overview gauge and the globe label

mod coordinator;
mod feed;
mod types;

pub use coordinator::{FeedStatus, TelemetryBinding, TelemetryCoordinator, TelemetryGauge};
pub use feed::TelemetryFeed;
