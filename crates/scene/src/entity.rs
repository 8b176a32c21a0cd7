use foundation::geo::LatLng;
use foundation::ids::{BuildingId, FeatureId, MarkerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub location: LatLng,
    /// Identifier in an external places directory, if known.
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub floor_count: Option<u32>,
}

impl Building {
    pub fn new(id: impl Into<BuildingId>, name: impl Into<String>, location: LatLng) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            location,
            external_ref: None,
            floor_count: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_floor_count(mut self, floors: u32) -> Self {
        self.floor_count = Some(floors);
        self
    }
}

/// Building record not yet assigned an id by the data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    pub address: Option<String>,
    pub location: LatLng,
    pub external_ref: Option<String>,
    pub floor_count: Option<u32>,
}

impl NewBuilding {
    pub fn into_building(self, id: BuildingId) -> Building {
        Building {
            id,
            name: self.name,
            address: self.address,
            location: self.location,
            external_ref: self.external_ref,
            floor_count: self.floor_count,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Standard,
    Corner,
    Large,
    Bay,
}

impl FeatureKind {
    pub fn label(self) -> &'static str {
        match self {
            FeatureKind::Standard => "Standard",
            FeatureKind::Corner => "Corner",
            FeatureKind::Large => "Large",
            FeatureKind::Bay => "Bay",
        }
    }
}

/// Where a feature record came from. Synthetic features are estimates for
/// visualization only.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Detected,
    Synthetic,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSize {
    pub width: f64,
    pub height: f64,
}

/// A window on one floor of a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub building_id: BuildingId,
    /// 1-based.
    pub floor_index: u32,
    pub kind: FeatureKind,
    pub position: LatLng,
    pub size: FeatureSize,
    pub confidence: f64,
    /// Meters above ground.
    pub estimated_height: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMarker {
    pub id: MarkerId,
    pub position: LatLng,
    pub label: String,
    /// CSS hex color, e.g. `#ef4444`.
    pub color: String,
    pub source_note: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Building,
    Feature,
    AnalysisMarker,
}
