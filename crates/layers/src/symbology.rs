use scene::entity::FeatureKind;
use serde::Serialize;

/// Per-floor window colors, cycled by `(floor - 1) % len`.
pub const FLOOR_PALETTE: [&str; 17] = [
    "#ff4444", "#ff8844", "#ffcc44", "#ccff44", "#88ff44", "#44ff44", "#44ff88", "#44ffcc",
    "#44ccff", "#4488ff", "#4444ff", "#8844ff", "#cc44ff", "#ff44cc", "#ff4488", "#ff6666",
    "#ffaa66",
];

/// z-order step between floors; higher floors draw above lower ones.
pub const FLOOR_Z_STEP: i32 = 10;

pub const BUILDING_Z: i32 = 0;
pub const ANALYSIS_Z: i32 = 0;

pub const BUILDING_FILL: &str = "#2563eb";
pub const BUILDING_STROKE: &str = "#1e40af";
pub const SELECTED_FILL: &str = "#dc2626";
pub const SELECTED_STROKE: &str = "#b91c1c";
pub const WINDOW_STROKE: &str = "#ffffff";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    Building,
    Window(FeatureKind),
    Analysis,
}

/// Screen-space icon description; independent of zoom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IconSpec {
    pub glyph: Glyph,
    pub fill: String,
    pub stroke: String,
    pub size_px: [u32; 2],
    /// Pixel inside the icon that sits on the marker position.
    pub anchor_px: [u32; 2],
}

pub fn floor_color(floor_index: u32) -> &'static str {
    let i = floor_index.saturating_sub(1) as usize % FLOOR_PALETTE.len();
    FLOOR_PALETTE[i]
}

pub fn floor_z(floor_index: u32) -> i32 {
    i32::try_from(floor_index)
        .unwrap_or(i32::MAX)
        .saturating_mul(FLOOR_Z_STEP)
}

pub fn window_icon(kind: FeatureKind, floor_index: u32) -> IconSpec {
    let (size_px, anchor_px) = match kind {
        FeatureKind::Large => ([16, 14], [8, 7]),
        FeatureKind::Corner => ([14, 12], [6, 6]),
        FeatureKind::Standard | FeatureKind::Bay => ([12, 12], [6, 6]),
    };
    IconSpec {
        glyph: Glyph::Window(kind),
        fill: floor_color(floor_index).to_owned(),
        stroke: WINDOW_STROKE.to_owned(),
        size_px,
        anchor_px,
    }
}

pub fn building_icon(selected: bool) -> IconSpec {
    let (fill, stroke) = if selected {
        (SELECTED_FILL, SELECTED_STROKE)
    } else {
        (BUILDING_FILL, BUILDING_STROKE)
    };
    IconSpec {
        glyph: Glyph::Building,
        fill: fill.to_owned(),
        stroke: stroke.to_owned(),
        size_px: [30, 30],
        anchor_px: [15, 30],
    }
}

pub fn analysis_icon(color: &str) -> IconSpec {
    IconSpec {
        glyph: Glyph::Analysis,
        fill: color.to_owned(),
        stroke: WINDOW_STROKE.to_owned(),
        size_px: [24, 24],
        anchor_px: [12, 12],
    }
}

#[cfg(test)]
mod tests {
    use super::{FLOOR_PALETTE, building_icon, floor_color, floor_z, window_icon};
    use scene::entity::FeatureKind;

    #[test]
    fn palette_wraps_after_last_floor() {
        assert_eq!(floor_color(1), "#ff4444");
        assert_eq!(floor_color(17), "#ffaa66");
        assert_eq!(floor_color(18), floor_color(1));
        assert_eq!(floor_color(1 + 3 * FLOOR_PALETTE.len() as u32), "#ff4444");
    }

    #[test]
    fn higher_floors_sit_above() {
        assert_eq!(floor_z(1), 10);
        assert_eq!(floor_z(17), 170);
        assert!(floor_z(5) > floor_z(4));
        assert_eq!(floor_z(u32::MAX), i32::MAX);
    }

    #[test]
    fn glyph_size_depends_only_on_kind() {
        assert_eq!(window_icon(FeatureKind::Large, 1).size_px, [16, 14]);
        assert_eq!(window_icon(FeatureKind::Corner, 9).size_px, [14, 12]);
        assert_eq!(window_icon(FeatureKind::Bay, 3).size_px, [12, 12]);
        assert_eq!(
            window_icon(FeatureKind::Standard, 2).size_px,
            window_icon(FeatureKind::Standard, 12).size_px
        );
    }

    #[test]
    fn selection_changes_building_colors() {
        assert_ne!(building_icon(true).fill, building_icon(false).fill);
        assert_eq!(building_icon(true).size_px, building_icon(false).size_px);
    }
}
