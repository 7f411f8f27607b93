//! Geographic helpers for the globe.
//!
//! This module provides the static city list, the lat/lon to sphere
//! projection, and the registry of projected positions used by the camera.

mod cities;
mod positions;
mod projection;

pub use cities::{get_city, GeoPoint, CITIES};
pub use positions::PositionRegistry;
pub use projection::{project, project_point};
