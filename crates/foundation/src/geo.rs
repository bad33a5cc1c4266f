use serde::{Deserialize, Serialize};

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` when both components are finite and inside WGS84 degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A map view target: center plus zoom level.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self { center, zoom }
    }

    pub fn at(lat: f64, lng: f64, zoom: f64) -> Self {
        Self::new(LatLng::new(lat, lng), zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::LatLng;

    #[test]
    fn validates_degree_ranges() {
        assert!(LatLng::new(-90.0, 180.0).is_valid());
        assert!(LatLng::new(2.8, 18.35).is_valid());
        assert!(!LatLng::new(90.5, 0.0).is_valid());
        assert!(!LatLng::new(0.0, -180.01).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
    }
}
