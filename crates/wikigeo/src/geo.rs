//! Coordinates and great-circle distance.
use wikigeo_api::Coordinate;

/// Earth radius used for distances, in kilometres (equatorial).
pub const EARTH_RADIUS_KM: f64 = 6378.0;

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Self) -> f64 {
        km_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for Coordinates {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            lat: coordinate.lat,
            lon: coordinate.lon,
        }
    }
}

/// Great-circle distance in kilometres by the spherical law of cosines.
///
/// The cosine is clamped to [-1, 1]: for identical or antipodal points rounding can push
/// it just outside the domain of `acos`.
pub fn km_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat_a, lon_a) = (lat1.to_radians(), lon1.to_radians());
    let (lat_b, lon_b) = (lat2.to_radians(), lon2.to_radians());
    let cosine = lat_a.cos() * lat_b.cos() * (lon_b - lon_a).cos() + lat_a.sin() * lat_b.sin();
    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}
