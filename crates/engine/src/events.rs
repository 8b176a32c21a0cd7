use foundation::ids::BuildingId;
use serde::Serialize;
use viewport::{Outcome, Viewport};

/// Notifications delivered to engine subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ViewportChanged { viewport: Viewport },
    SelectionChanged { building: Option<BuildingId> },
    /// The entity store moved to `revision`.
    EntitiesChanged { revision: u64 },
    FeatureVisibilityChanged { visible: bool },
    EnhancedRotationChanged { active: bool },
    GroundViewChanged { open: bool },
    HighDetailFinished { outcome: Outcome },
}
