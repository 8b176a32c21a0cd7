use serde::{Deserialize, Serialize};

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Offset by raw degree deltas.
    pub fn offset(self, dlat: f64, dlng: f64) -> Self {
        Self::new(self.lat + dlat, self.lng + dlng)
    }

    /// Clamp latitude to the Web-Mercator band and wrap longitude into `[-180, 180)`.
    pub fn normalized(self) -> Self {
        let lat = self.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let lng = (self.lng + 180.0).rem_euclid(360.0) - 180.0;
        Self::new(lat, lng)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Latitude limit of the Web-Mercator projection used by tiled map renderers.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Straight-line distance in coordinate-degree space.
///
/// This is a flat-earth approximation: one degree of longitude shrinks with
/// latitude, so the real-world meaning of a fixed threshold varies. It is only
/// meant for short-range proximity tests at building zoom levels, never as a
/// geodesic distance.
pub fn degree_distance(a: LatLng, b: LatLng) -> f64 {
    let dlat = a.lat - b.lat;
    let dlng = a.lng - b.lng;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// Degrees of longitude covered by one screen pixel at `zoom` (256 px tiles).
pub fn degrees_per_pixel(zoom: f64) -> f64 {
    360.0 / (256.0 * 2f64.powf(zoom))
}

#[cfg(test)]
mod tests {
    use super::{LatLng, degree_distance, degrees_per_pixel};

    #[test]
    fn distance_is_euclidean_in_degrees() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0003, 0.0004);
        assert!((degree_distance(a, b) - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn normalized_wraps_longitude() {
        let p = LatLng::new(95.0, 190.0).normalized();
        assert!(p.lat < 85.06);
        assert!((p.lng - -170.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_scale_halves_per_zoom() {
        let z10 = degrees_per_pixel(10.0);
        let z11 = degrees_per_pixel(11.0);
        assert!((z10 / z11 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn display_uses_six_decimals() {
        assert_eq!(LatLng::new(42.33361, -83.06028).to_string(), "42.333610, -83.060280");
    }
}
