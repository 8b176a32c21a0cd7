use std::collections::{BTreeMap, BTreeSet};

use foundation::ids::{BuildingId, FeatureId, MarkerId};
use tracing::debug;

use crate::entity::{AnalysisMarker, Building, Feature};
use crate::history::RecentHistory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownBuilding(BuildingId),
    InvalidLocation(BuildingId),
    DuplicateFeature(FeatureId),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownBuilding(id) => write!(f, "unknown building {id}"),
            StoreError::InvalidLocation(id) => write!(f, "building {id} has a non-finite location"),
            StoreError::DuplicateFeature(id) => write!(f, "duplicate feature id {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Enriched,
    Unchanged,
}

/// Authoritative in-memory collection of buildings, their features and the
/// transient analysis markers.
///
/// All mutation goes through `&mut self`, so readers always see a settled
/// state. `revision` increases on every mutation that changed something.
///
/// Ordering contract:
/// - Buildings iterate in ascending id order.
/// - Features of a building keep the order they were supplied in.
/// - Analysis markers keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    buildings: BTreeMap<BuildingId, Building>,
    features: BTreeMap<BuildingId, Vec<Feature>>,
    selected: Option<BuildingId>,
    history: RecentHistory,
    analysis: Vec<AnalysisMarker>,
    revision: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            history: RecentHistory::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn building(&self, id: &BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> + '_ {
        self.buildings.values()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn features(&self, id: &BuildingId) -> &[Feature] {
        self.features.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn feature_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }

    /// A known building with no features yet.
    pub fn needs_features(&self, id: &BuildingId) -> bool {
        self.buildings.contains_key(id) && self.features(id).is_empty()
    }

    pub fn selected(&self) -> Option<&BuildingId> {
        self.selected.as_ref()
    }

    pub fn selected_building(&self) -> Option<&Building> {
        self.selected.as_ref().and_then(|id| self.buildings.get(id))
    }

    /// Recently selected buildings, most recent first.
    pub fn recent_history(&self) -> impl Iterator<Item = &Building> + '_ {
        self.history.iter().filter_map(|id| self.buildings.get(id))
    }

    pub fn history(&self) -> &RecentHistory {
        &self.history
    }

    pub fn analysis_markers(&self) -> &[AnalysisMarker] {
        &self.analysis
    }

    /// Insert a new building, or enrich an existing one.
    ///
    /// An existing building keeps its location; only `name`, `address`,
    /// `external_ref` and `floor_count` are taken from `building`, and absent
    /// optional values never erase known ones.
    pub fn upsert_building(&mut self, building: Building) -> Result<Upsert, StoreError> {
        if !building.location.is_finite() {
            return Err(StoreError::InvalidLocation(building.id));
        }
        let Some(existing) = self.buildings.get_mut(&building.id) else {
            debug!(building = %building.id, "building created");
            self.buildings.insert(building.id.clone(), building);
            self.bump();
            return Ok(Upsert::Created);
        };

        let mut changed = false;
        if existing.name != building.name {
            existing.name = building.name;
            changed = true;
        }
        changed |= enrich(&mut existing.address, building.address);
        changed |= enrich(&mut existing.external_ref, building.external_ref);
        changed |= enrich(&mut existing.floor_count, building.floor_count);
        if !changed {
            return Ok(Upsert::Unchanged);
        }
        self.bump();
        Ok(Upsert::Enriched)
    }

    /// Replace all features of `id`. Every feature's back-reference is set to
    /// `id`.
    pub fn set_features(
        &mut self,
        id: &BuildingId,
        mut features: Vec<Feature>,
    ) -> Result<usize, StoreError> {
        if !self.buildings.contains_key(id) {
            return Err(StoreError::UnknownBuilding(id.clone()));
        }
        let mut seen = BTreeSet::new();
        for f in &mut features {
            if !seen.insert(f.id.clone()) {
                return Err(StoreError::DuplicateFeature(f.id.clone()));
            }
            f.building_id = id.clone();
        }
        let n = features.len();
        debug!(building = %id, features = n, "features replaced");
        self.features.insert(id.clone(), features);
        self.bump();
        Ok(n)
    }

    /// Change the selection. Selecting a different building (or clearing it)
    /// drops the analysis markers of the previous one.
    ///
    /// Returns `true` if the selection changed.
    pub fn select_building(&mut self, id: Option<&BuildingId>) -> Result<bool, StoreError> {
        if let Some(id) = id
            && !self.buildings.contains_key(id)
        {
            return Err(StoreError::UnknownBuilding(id.clone()));
        }
        if self.selected.as_ref() == id {
            return Ok(false);
        }
        self.selected = id.cloned();
        self.analysis.clear();
        self.bump();
        Ok(true)
    }

    pub fn add_to_recent_history(&mut self, id: &BuildingId) -> Result<bool, StoreError> {
        if !self.buildings.contains_key(id) {
            return Err(StoreError::UnknownBuilding(id.clone()));
        }
        let changed = self.history.push(id.clone());
        if changed {
            self.bump();
        }
        Ok(changed)
    }

    /// Add markers; a marker whose id is already present replaces the old one
    /// in place.
    pub fn add_analysis_markers(&mut self, markers: Vec<AnalysisMarker>) -> usize {
        let n = markers.len();
        for m in markers {
            match self.analysis.iter_mut().find(|e| e.id == m.id) {
                Some(slot) => *slot = m,
                None => self.analysis.push(m),
            }
        }
        if n > 0 {
            self.bump();
        }
        n
    }

    pub fn clear_analysis_markers(&mut self) -> bool {
        if self.analysis.is_empty() {
            return false;
        }
        self.analysis.clear();
        self.bump();
        true
    }

    pub fn analysis_marker(&self, id: &MarkerId) -> Option<&AnalysisMarker> {
        self.analysis.iter().find(|m| &m.id == id)
    }

    /// Remove a building with its features, history entry and selection.
    pub fn remove_building(&mut self, id: &BuildingId) -> Result<Building, StoreError> {
        let building = self
            .buildings
            .remove(id)
            .ok_or_else(|| StoreError::UnknownBuilding(id.clone()))?;
        self.features.remove(id);
        self.history.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            self.analysis.clear();
        }
        debug!(building = %id, "building removed");
        self.bump();
        Ok(building)
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

fn enrich<T: PartialEq>(slot: &mut Option<T>, incoming: Option<T>) -> bool {
    match incoming {
        Some(v) if slot.as_ref() != Some(&v) => {
            *slot = Some(v);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityStore, StoreError, Upsert};
    use crate::entity::{
        AnalysisMarker, Building, Feature, FeatureKind, FeatureSize, Provenance,
    };
    use foundation::geo::LatLng;
    use foundation::ids::{BuildingId, FeatureId, MarkerId};
    use pretty_assertions::assert_eq;

    fn building(id: &str) -> Building {
        Building::new(id, id.to_uppercase(), LatLng::new(42.0, -83.0))
    }

    fn feature(id: &str, owner: &str) -> Feature {
        Feature {
            id: FeatureId::new(id),
            building_id: BuildingId::new(owner),
            floor_index: 1,
            kind: FeatureKind::Standard,
            position: LatLng::new(42.0, -83.0),
            size: FeatureSize {
                width: 1.5,
                height: 1.2,
            },
            confidence: 0.9,
            estimated_height: 3.5,
            provenance: Provenance::Detected,
        }
    }

    fn marker(id: &str) -> AnalysisMarker {
        AnalysisMarker {
            id: MarkerId::new(id),
            position: LatLng::new(0.0, 0.0),
            label: id.to_owned(),
            color: "#000000".to_owned(),
            source_note: String::new(),
        }
    }

    #[test]
    fn upsert_creates_then_enriches_without_moving() {
        let mut s = EntityStore::new();
        assert_eq!(s.upsert_building(building("a")), Ok(Upsert::Created));

        let mut moved = building("a").with_address("1 Main St");
        moved.location = LatLng::new(0.0, 0.0);
        assert_eq!(s.upsert_building(moved), Ok(Upsert::Enriched));

        let a = s.building(&"a".into()).unwrap();
        assert_eq!(a.address.as_deref(), Some("1 Main St"));
        assert_eq!(a.location, LatLng::new(42.0, -83.0));

        assert_eq!(s.upsert_building(building("a")), Ok(Upsert::Unchanged));
        assert_eq!(s.building(&"a".into()).unwrap().address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn upsert_rejects_non_finite_location() {
        let mut s = EntityStore::new();
        let b = Building::new("x", "X", LatLng::new(f64::NAN, 0.0));
        assert_eq!(
            s.upsert_building(b),
            Err(StoreError::InvalidLocation("x".into()))
        );
        assert_eq!(s.revision(), 0);
    }

    #[test]
    fn set_features_replaces_and_rewrites_owner() {
        let mut s = EntityStore::new();
        s.upsert_building(building("a")).unwrap();
        assert!(s.needs_features(&"a".into()));

        s.set_features(&"a".into(), vec![feature("w1", "zzz"), feature("w2", "a")])
            .unwrap();
        assert!(s.features(&"a".into()).iter().all(|f| f.building_id.as_str() == "a"));

        s.set_features(&"a".into(), vec![feature("w3", "a")]).unwrap();
        let ids: Vec<&str> = s.features(&"a".into()).iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["w3"]);
        assert!(!s.needs_features(&"a".into()));
    }

    #[test]
    fn set_features_rejects_duplicates_and_unknown_buildings() {
        let mut s = EntityStore::new();
        s.upsert_building(building("a")).unwrap();
        assert_eq!(
            s.set_features(&"a".into(), vec![feature("w", "a"), feature("w", "a")]),
            Err(StoreError::DuplicateFeature("w".into()))
        );
        assert!(s.features(&"a".into()).is_empty());
        assert_eq!(
            s.set_features(&"nope".into(), vec![]),
            Err(StoreError::UnknownBuilding("nope".into()))
        );
    }

    #[test]
    fn new_selection_clears_analysis_markers() {
        let mut s = EntityStore::new();
        s.upsert_building(building("a")).unwrap();
        s.upsert_building(building("b")).unwrap();

        assert_eq!(s.select_building(Some(&"a".into())), Ok(true));
        s.add_analysis_markers(vec![marker("m1"), marker("m2")]);
        assert_eq!(s.select_building(Some(&"a".into())), Ok(false));
        assert_eq!(s.analysis_markers().len(), 2);

        assert_eq!(s.select_building(Some(&"b".into())), Ok(true));
        assert!(s.analysis_markers().is_empty());
        assert_eq!(s.selected_building().map(|b| b.name.as_str()), Some("B"));
    }

    #[test]
    fn selecting_unknown_building_is_an_error() {
        let mut s = EntityStore::new();
        assert_eq!(
            s.select_building(Some(&"ghost".into())),
            Err(StoreError::UnknownBuilding("ghost".into()))
        );
        assert_eq!(s.select_building(None), Ok(false));
    }

    #[test]
    fn markers_with_same_id_replace_in_place() {
        let mut s = EntityStore::new();
        s.add_analysis_markers(vec![marker("m1"), marker("m2")]);
        let mut m1 = marker("m1");
        m1.label = "updated".to_owned();
        s.add_analysis_markers(vec![m1]);
        let labels: Vec<&str> = s.analysis_markers().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["updated", "m2"]);
        assert!(s.clear_analysis_markers());
        assert!(!s.clear_analysis_markers());
    }

    #[test]
    fn remove_building_drops_everything_referencing_it() {
        let mut s = EntityStore::new();
        s.upsert_building(building("a")).unwrap();
        s.set_features(&"a".into(), vec![feature("w1", "a")]).unwrap();
        s.select_building(Some(&"a".into())).unwrap();
        s.add_to_recent_history(&"a".into()).unwrap();

        let removed = s.remove_building(&"a".into()).unwrap();
        assert_eq!(removed.id.as_str(), "a");
        assert_eq!(s.selected(), None);
        assert_eq!(s.feature_count(), 0);
        assert!(s.history().is_empty());
        assert!(s.remove_building(&"a".into()).is_err());
    }

    #[test]
    fn revision_moves_only_on_effective_mutation() {
        let mut s = EntityStore::new();
        s.upsert_building(building("a")).unwrap();
        let r = s.revision();
        s.select_building(None).unwrap();
        s.clear_analysis_markers();
        s.upsert_building(building("a")).unwrap();
        assert_eq!(s.revision(), r);
        s.add_to_recent_history(&"a".into()).unwrap();
        assert_eq!(s.revision(), r + 1);
    }

    #[test]
    fn history_lists_buildings_most_recent_first() {
        let mut s = EntityStore::with_history_capacity(2);
        for id in ["a", "b", "c"] {
            s.upsert_building(building(id)).unwrap();
            s.add_to_recent_history(&id.into()).unwrap();
        }
        let names: Vec<&str> = s.recent_history().map(|b| b.id.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }
}
