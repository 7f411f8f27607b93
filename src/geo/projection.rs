//! Globe projection.
//!
//! Converts geographic coordinates (lat/lon) into positions on a sphere
//! centered at the scene origin, with +Y pointing at the north pole.

use glam::Vec3;

use super::cities::GeoPoint;

/// Projects a latitude/longitude pair (degrees) onto a sphere of `radius`.
///
/// The polar angle is measured from the north pole (`90 - lat`) and the
/// azimuth is offset by 180 degrees so that longitude 0 faces -X, matching
/// the seam of an equirectangular earth texture. Inputs are not clamped:
/// out-of-range coordinates still land on the sphere, just not anywhere
/// meaningful.
pub fn project(latitude: f64, longitude: f64, radius: f32) -> Vec3 {
    let phi = (90.0 - latitude).to_radians();
    let theta = (longitude + 180.0).to_radians();
    let radius = radius as f64;

    let x = -radius * phi.sin() * theta.cos();
    let y = radius * phi.cos();
    let z = radius * phi.sin() * theta.sin();

    Vec3::new(x as f32, y as f32, z as f32)
}

/// Projects a named location onto a sphere of `radius`.
pub fn project_point(point: &GeoPoint, radius: f32) -> Vec3 {
    project(point.latitude(), point.longitude(), radius)
}
