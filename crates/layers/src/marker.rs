use foundation::geo::LatLng;
use foundation::ids::{BuildingId, FeatureId, MarkerId};
use foundation::math::precision::canonical_f64;
use scene::entity::{AnalysisMarker, Building, EntityKind, Feature};
use serde::Serialize;

use crate::symbology::{
    ANALYSIS_Z, BUILDING_Z, Glyph, IconSpec, analysis_icon, building_icon, floor_z, window_icon,
};
use crate::tooltip::{Tooltip, analysis_tooltip, building_tooltip, feature_tooltip};

/// Identity of a visual marker: one live marker per `(kind, id)`.
///
/// Ordering contract: kind first (buildings, features, analysis), then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MarkerKey {
    pub kind: EntityKind,
    pub id: String,
}

impl MarkerKey {
    pub fn building(id: &BuildingId) -> Self {
        Self {
            kind: EntityKind::Building,
            id: id.as_str().to_owned(),
        }
    }

    pub fn feature(id: &FeatureId) -> Self {
        Self {
            kind: EntityKind::Feature,
            id: id.as_str().to_owned(),
        }
    }

    pub fn analysis(id: &MarkerId) -> Self {
        Self {
            kind: EntityKind::AnalysisMarker,
            id: id.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            EntityKind::Building => "building",
            EntityKind::Feature => "feature",
            EntityKind::AnalysisMarker => "analysis",
        };
        write!(f, "{kind}:{}", self.id)
    }
}

/// Map-bound projection of one entity. Disposable; derived entirely from
/// the entity store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualMarker {
    pub key: MarkerKey,
    pub position: LatLng,
    pub icon: IconSpec,
    pub z_index: i32,
    pub title: String,
    pub tooltip: String,
}

impl VisualMarker {
    pub fn for_building(building: &Building, selected: bool) -> Self {
        Self::assemble(
            MarkerKey::building(&building.id),
            building.location,
            building_icon(selected),
            BUILDING_Z,
            building_tooltip(building),
        )
    }

    pub fn for_feature(feature: &Feature) -> Self {
        Self::assemble(
            MarkerKey::feature(&feature.id),
            feature.position,
            window_icon(feature.kind, feature.floor_index),
            floor_z(feature.floor_index),
            feature_tooltip(feature),
        )
    }

    pub fn for_analysis(marker: &AnalysisMarker, context: Option<&str>) -> Self {
        Self::assemble(
            MarkerKey::analysis(&marker.id),
            marker.position,
            analysis_icon(&marker.color),
            ANALYSIS_Z,
            analysis_tooltip(marker, context),
        )
    }

    fn assemble(
        key: MarkerKey,
        position: LatLng,
        icon: IconSpec,
        z_index: i32,
        t: Tooltip,
    ) -> Self {
        Self {
            key,
            position,
            icon,
            z_index,
            title: t.title,
            tooltip: t.body,
        }
    }

    /// BLAKE3 digest of every rendered attribute (everything but the key).
    ///
    /// Two markers with equal hashes render identically, so the synchronizer
    /// can skip the update.
    pub fn attribute_hash(&self) -> blake3::Hash {
        let mut h = blake3::Hasher::new();
        h.update(&canonical_f64(self.position.lat).to_le_bytes());
        h.update(&canonical_f64(self.position.lng).to_le_bytes());
        match self.icon.glyph {
            Glyph::Building => h.update(b"building"),
            Glyph::Analysis => h.update(b"analysis"),
            Glyph::Window(kind) => h.update(b"window:").update(kind.label().as_bytes()),
        };
        for s in [&self.icon.fill, &self.icon.stroke, &self.title, &self.tooltip] {
            // Length prefix keeps field boundaries unambiguous.
            h.update(&(s.len() as u64).to_le_bytes());
            h.update(s.as_bytes());
        }
        for v in self.icon.size_px.iter().chain(&self.icon.anchor_px) {
            h.update(&v.to_le_bytes());
        }
        h.update(&self.z_index.to_le_bytes());
        h.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerKey, VisualMarker};
    use foundation::geo::LatLng;
    use foundation::ids::BuildingId;
    use scene::entity::{Building, EntityKind};

    fn tower() -> Building {
        Building::new("t", "Tower", LatLng::new(42.0, -83.0))
    }

    #[test]
    fn keys_order_by_kind_then_id() {
        let b = MarkerKey::building(&BuildingId::new("z"));
        let f = MarkerKey::feature(&"a".into());
        assert!(b < f);
        assert_eq!(f.kind, EntityKind::Feature);
        assert_eq!(f.to_string(), "feature:a");
    }

    #[test]
    fn hash_is_stable_for_equal_markers() {
        let a = VisualMarker::for_building(&tower(), false);
        let b = VisualMarker::for_building(&tower(), false);
        assert_eq!(a.attribute_hash(), b.attribute_hash());
    }

    #[test]
    fn hash_tracks_selection_and_tooltip() {
        let plain = VisualMarker::for_building(&tower(), false);
        let selected = VisualMarker::for_building(&tower(), true);
        assert_ne!(plain.attribute_hash(), selected.attribute_hash());

        let renamed = VisualMarker::for_building(&tower().with_address("1 Main"), false);
        assert_ne!(plain.attribute_hash(), renamed.attribute_hash());
    }
}
