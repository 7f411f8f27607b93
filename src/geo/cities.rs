//! Named locations shown on the globe.

use geo_types::Coord;

/// A named location identified by latitude/longitude.
///
/// The coordinate follows the `geo_types` convention: `x` is longitude and
/// `y` is latitude, both in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub name: &'static str,
    pub coord: Coord<f64>,
}

impl GeoPoint {
    pub const fn new(name: &'static str, latitude: f64, longitude: f64) -> Self {
        Self {
            name,
            coord: Coord {
                x: longitude,
                y: latitude,
            },
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coord.y
    }

    pub fn longitude(&self) -> f64 {
        self.coord.x
    }
}

/// Cities pinned on the globe, in carousel slide order (slides 1..=5).
pub static CITIES: &[GeoPoint] = &[
    GeoPoint::new("Paris", 48.8566, 2.3522),
    GeoPoint::new("New York", 40.7128, -74.006),
    GeoPoint::new("Tokyo", 35.6895, 139.6917),
    GeoPoint::new("Cape Town", -33.9249, 18.4241),
    GeoPoint::new("Sydney", -33.8688, 151.2093),
];

/// Look up a city by name.
pub fn get_city(name: &str) -> Option<&'static GeoPoint> {
    CITIES.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_coordinates_in_range() {
        for city in CITIES {
            assert!((-90.0..=90.0).contains(&city.latitude()), "{}", city.name);
            assert!((-180.0..=180.0).contains(&city.longitude()), "{}", city.name);
        }
    }

    #[test]
    fn test_get_city() {
        let tokyo = get_city("Tokyo").unwrap();
        assert_eq!(tokyo.latitude(), 35.6895);
        assert_eq!(tokyo.longitude(), 139.6917);
        assert!(get_city("Atlantis").is_none());
    }
}
