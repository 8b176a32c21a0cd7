//! Synthetic window layouts for buildings without detection data.
//!
//! Windows are spread evenly by angle around a perimeter whose radius is
//! jittered per window, so the outline is not a perfect circle. The RNG is
//! seeded from the building id, so a building always gets the same layout.
//! Output is tagged [`Provenance::Synthetic`] and is never ground truth.

use std::f64::consts::TAU;

use foundation::ids::FeatureId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::entity::{Building, Feature, FeatureKind, FeatureSize, Provenance};

/// Upper bounds on generated layouts; larger requests are clamped.
pub const MAX_FLOORS: u32 = 200;
pub const MAX_WINDOWS_PER_FLOOR: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowLayout {
    /// Used when the building does not know its floor count.
    pub floors: u32,
    pub windows_per_floor: u32,
    /// Nominal perimeter radius in degrees.
    pub radius_deg: f64,
    /// Relative radius perturbation; 0.3 means ±30 %.
    pub radius_jitter: f64,
    /// Meters per floor.
    pub floor_height: f64,
    pub window_size: FeatureSize,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl Default for WindowLayout {
    fn default() -> Self {
        Self {
            floors: 17,
            windows_per_floor: 35,
            radius_deg: 0.0008,
            radius_jitter: 0.3,
            floor_height: 3.5,
            window_size: FeatureSize {
                width: 1.5,
                height: 1.2,
            },
            min_confidence: 0.85,
            max_confidence: 1.0,
        }
    }
}

impl WindowLayout {
    /// Clamp fields into usable ranges. Non-finite values fall back to defaults.
    pub fn validated(self) -> Self {
        let d = Self::default();
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };

        let radius_deg = finite_or(self.radius_deg, d.radius_deg).abs();
        let radius_jitter = finite_or(self.radius_jitter, d.radius_jitter).clamp(0.0, 1.0);
        let floor_height = finite_or(self.floor_height, d.floor_height).max(0.0);
        let mut lo = finite_or(self.min_confidence, d.min_confidence).clamp(0.0, 1.0);
        let mut hi = finite_or(self.max_confidence, d.max_confidence).clamp(0.0, 1.0);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        let window_size = FeatureSize {
            width: finite_or(self.window_size.width, d.window_size.width).max(0.0),
            height: finite_or(self.window_size.height, d.window_size.height).max(0.0),
        };

        Self {
            floors: self.floors.min(MAX_FLOORS),
            windows_per_floor: self.windows_per_floor.min(MAX_WINDOWS_PER_FLOOR),
            radius_deg,
            radius_jitter,
            floor_height,
            window_size,
            min_confidence: lo,
            max_confidence: hi,
        }
    }
}

/// Kind of the `index`-th window on a floor (0-based).
pub fn kind_for_index(index: u32) -> FeatureKind {
    match index % 4 {
        0 => FeatureKind::Corner,
        1 => FeatureKind::Large,
        2 => FeatureKind::Standard,
        _ => FeatureKind::Bay,
    }
}

/// `<building>-window-<floor>-<n>` with both numbers 1-based.
pub fn window_id(building: &Building, floor: u32, n: u32) -> FeatureId {
    FeatureId::new(format!("{}-window-{floor}-{n}", building.id))
}

fn seed_for(building: &Building) -> [u8; 32] {
    *blake3::hash(building.id.as_str().as_bytes()).as_bytes()
}

/// Generate `floors * windows_per_floor` synthetic windows around `building`,
/// at most [`MAX_FLOORS`] by [`MAX_WINDOWS_PER_FLOOR`].
pub fn generate_windows(building: &Building, layout: &WindowLayout) -> Vec<Feature> {
    let floors = building.floor_count.unwrap_or(layout.floors).min(MAX_FLOORS);
    let per_floor = layout.windows_per_floor.min(MAX_WINDOWS_PER_FLOOR);
    let mut rng = StdRng::from_seed(seed_for(building));
    let mut out = Vec::with_capacity(floors as usize * per_floor as usize);

    let jitter = layout.radius_jitter;
    let center = building.location;

    for floor in 1..=floors {
        for i in 0..per_floor {
            let angle = f64::from(i) / f64::from(per_floor) * TAU;
            let factor = if jitter > 0.0 {
                rng.gen_range(1.0 - jitter..=1.0 + jitter)
            } else {
                1.0
            };
            let radius = layout.radius_deg * factor;
            let confidence = if layout.max_confidence > layout.min_confidence {
                rng.gen_range(layout.min_confidence..=layout.max_confidence)
            } else {
                layout.min_confidence
            };

            out.push(Feature {
                id: window_id(building, floor, i + 1),
                building_id: building.id.clone(),
                floor_index: floor,
                kind: kind_for_index(i),
                position: center.offset(angle.cos() * radius, angle.sin() * radius),
                size: layout.window_size,
                confidence,
                estimated_height: f64::from(floor) * layout.floor_height,
                provenance: Provenance::Synthetic,
            });
        }
    }

    out
}
