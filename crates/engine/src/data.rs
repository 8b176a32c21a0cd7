use std::collections::BTreeMap;

use foundation::ids::BuildingId;
use runtime::Ticket;
use scene::entity::{Building, Feature, NewBuilding};
use uuid::Uuid;

/// Handle for one asynchronous feature-detection request.
pub type DetectionTicket = Ticket<BuildingId>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The backend could not be reached or refused the request.
    Unavailable(String),
    /// The backend has no detection pipeline.
    Unsupported,
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Unavailable(msg) => write!(f, "data backend unavailable: {msg}"),
            DataError::Unsupported => write!(f, "feature detection is not supported"),
        }
    }
}

impl std::error::Error for DataError {}

/// The data-access collaborator that owns persistence.
pub trait DataAccess {
    /// Persist a new building and return it with its assigned id.
    fn save_building(&mut self, building: NewBuilding) -> Result<Building, DataError>;

    /// Stored feature records for `building`; empty if none exist.
    fn fetch_features(&mut self, building: &BuildingId) -> Result<Vec<Feature>, DataError>;

    /// Kick off detection. The result is delivered later through
    /// `Engine::resolve_detection` with the same ticket.
    fn start_feature_detection(&mut self, ticket: &DetectionTicket) -> Result<(), DataError>;
}

#[derive(Debug, Clone)]
enum IdMint {
    Uuid,
    Sequential(u64),
}

/// [`DataAccess`] kept entirely in memory.
///
/// Detection requests are queued; the host (or a test) drains them with
/// [`InMemoryDataAccess::take_detection_requests`] and answers each one with
/// [`InMemoryDataAccess::detection_result`].
#[derive(Debug, Clone)]
pub struct InMemoryDataAccess {
    mint: IdMint,
    buildings: BTreeMap<BuildingId, Building>,
    features: BTreeMap<BuildingId, Vec<Feature>>,
    detections: BTreeMap<BuildingId, Vec<Feature>>,
    detection_enabled: bool,
    requests: Vec<DetectionTicket>,
    failing: bool,
}

impl Default for InMemoryDataAccess {
    fn default() -> Self {
        Self {
            mint: IdMint::Uuid,
            buildings: BTreeMap::new(),
            features: BTreeMap::new(),
            detections: BTreeMap::new(),
            detection_enabled: true,
            requests: Vec::new(),
            failing: false,
        }
    }
}

impl InMemoryDataAccess {
    /// Ids are random v4 UUIDs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are `building-1`, `building-2`, ... for reproducible runs.
    pub fn sequential() -> Self {
        Self {
            mint: IdMint::Sequential(0),
            ..Self::default()
        }
    }

    pub fn without_detection(mut self) -> Self {
        self.detection_enabled = false;
        self
    }

    /// Make every call fail with [`DataError::Unavailable`].
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn insert_features(&mut self, building: BuildingId, features: Vec<Feature>) {
        self.features.insert(building, features);
    }

    /// Canned answer for future detection requests on `building`.
    pub fn insert_detection(&mut self, building: BuildingId, features: Vec<Feature>) {
        self.detections.insert(building, features);
    }

    pub fn building(&self, id: &BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    pub fn saved_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn take_detection_requests(&mut self) -> Vec<DetectionTicket> {
        std::mem::take(&mut self.requests)
    }

    /// Result for a drained request: the canned detection, or empty.
    pub fn detection_result(&self, ticket: &DetectionTicket) -> Result<Vec<Feature>, DataError> {
        self.check()?;
        Ok(self.detections.get(&ticket.key).cloned().unwrap_or_default())
    }

    fn check(&self) -> Result<(), DataError> {
        if self.failing {
            Err(DataError::Unavailable("backend marked failing".to_string()))
        } else {
            Ok(())
        }
    }

    fn mint_id(&mut self) -> BuildingId {
        match &mut self.mint {
            IdMint::Uuid => BuildingId::new(Uuid::new_v4().to_string()),
            IdMint::Sequential(n) => {
                *n += 1;
                BuildingId::new(format!("building-{n}"))
            }
        }
    }
}

impl DataAccess for InMemoryDataAccess {
    fn save_building(&mut self, building: NewBuilding) -> Result<Building, DataError> {
        self.check()?;
        let id = self.mint_id();
        let building = building.into_building(id);
        self.buildings.insert(building.id.clone(), building.clone());
        Ok(building)
    }

    fn fetch_features(&mut self, building: &BuildingId) -> Result<Vec<Feature>, DataError> {
        self.check()?;
        Ok(self.features.get(building).cloned().unwrap_or_default())
    }

    fn start_feature_detection(&mut self, ticket: &DetectionTicket) -> Result<(), DataError> {
        self.check()?;
        if !self.detection_enabled {
            return Err(DataError::Unsupported);
        }
        self.requests.push(ticket.clone());
        Ok(())
    }
}
