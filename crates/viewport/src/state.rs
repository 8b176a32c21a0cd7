use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 22.0;
pub const MIN_TILT: f64 = 0.0;
pub const MAX_TILT: f64 = 67.5;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    Road,
    Satellite,
    Hybrid,
    Terrain,
}

impl MapType {
    /// Imagery-backed types lose their 3D massing below building zoom.
    pub fn is_imagery(self) -> bool {
        matches!(self, MapType::Satellite | MapType::Hybrid)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingMode {
    #[default]
    Vector,
    Raster,
}

/// Camera state of the map surface.
///
/// Invariants (upheld by [`crate::ViewportMachine`]):
/// - `MIN_ZOOM <= zoom <= MAX_ZOOM`
/// - `MIN_TILT <= tilt <= MAX_TILT`
/// - `0 <= heading < 360`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub tilt: f64,
    pub heading: f64,
    pub map_type: MapType,
    pub rendering_mode: RenderingMode,
}

impl Viewport {
    pub fn satisfies_invariants(&self) -> bool {
        (MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom)
            && (MIN_TILT..=MAX_TILT).contains(&self.tilt)
            && (0.0..360.0).contains(&self.heading)
    }
}

/// Renderer options that are not part of the camera itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererOptions {
    pub rendering_mode: RenderingMode,
    /// Vector-only style identifier; some renderers refuse tilt while it is set.
    pub map_id: Option<String>,
    pub tilt_interaction: bool,
    pub heading_interaction: bool,
    pub fractional_zoom: bool,
}

impl RendererOptions {
    pub fn interactive(rendering_mode: RenderingMode, map_id: Option<String>) -> Self {
        Self {
            rendering_mode,
            map_id,
            tilt_interaction: true,
            heading_interaction: true,
            fractional_zoom: true,
        }
    }
}

/// Camera presets used at start-up and by `reset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub home: LatLng,
    pub initial_zoom: f64,
    pub initial_tilt: f64,
    pub initial_heading: f64,
    pub reset_zoom: f64,
    pub reset_tilt: f64,
    pub map_id: Option<String>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            home: LatLng::new(42.33361, -83.06028),
            initial_zoom: 21.0,
            initial_tilt: MAX_TILT,
            initial_heading: 45.0,
            reset_zoom: 21.0,
            reset_tilt: 45.0,
            map_id: Some("90f87356969d889c".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MapType, Viewport, ViewportConfig};

    #[test]
    fn invariant_check_rejects_full_turn_heading() {
        let cfg = ViewportConfig::default();
        let mut v = Viewport {
            center: cfg.home,
            zoom: 10.0,
            tilt: 10.0,
            heading: 0.0,
            map_type: MapType::Road,
            rendering_mode: Default::default(),
        };
        assert!(v.satisfies_invariants());
        v.heading = 360.0;
        assert!(!v.satisfies_invariants());
    }

    #[test]
    fn imagery_types() {
        assert!(MapType::Hybrid.is_imagery());
        assert!(!MapType::Terrain.is_imagery());
    }
}
