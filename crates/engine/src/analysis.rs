use foundation::ids::MarkerId;
use scene::entity::{AnalysisMarker, Building};
use serde::{Deserialize, Serialize};

/// Research point placed around a building when its analysis opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResearchPoint {
    pub dlat: f64,
    pub dlng: f64,
    pub label: &'static str,
    pub color: &'static str,
    pub source: &'static str,
}

pub const RESEARCH_POINTS: [ResearchPoint; 6] = [
    ResearchPoint {
        dlat: 0.0008,
        dlng: 0.0008,
        label: "Energy Research",
        color: "#ef4444",
        source: "Based on public utility data",
    },
    ResearchPoint {
        dlat: -0.0008,
        dlng: 0.0008,
        label: "Window Analysis",
        color: "#10b981",
        source: "From satellite imagery study",
    },
    ResearchPoint {
        dlat: 0.0008,
        dlng: -0.0008,
        label: "Climate Research",
        color: "#f59e0b",
        source: "NOAA weather data analysis",
    },
    ResearchPoint {
        dlat: -0.0008,
        dlng: -0.0008,
        label: "Efficiency Study",
        color: "#8b5cf6",
        source: "Industry benchmark comparison",
    },
    ResearchPoint {
        dlat: 0.0,
        dlng: 0.0012,
        label: "Thermal Research",
        color: "#06b6d4",
        source: "From building documentation",
    },
    ResearchPoint {
        dlat: 0.0,
        dlng: -0.0012,
        label: "Structural Data",
        color: "#ec4899",
        source: "Public building records",
    },
];

/// Analysis markers for `building`, ids `<building>-analysis-<n>`.
pub fn analysis_markers_around(building: &Building) -> Vec<AnalysisMarker> {
    RESEARCH_POINTS
        .iter()
        .enumerate()
        .map(|(i, p)| AnalysisMarker {
            id: MarkerId::new(format!("{}-analysis-{}", building.id, i + 1)),
            position: building.location.offset(p.dlat, p.dlng),
            label: p.label.to_owned(),
            color: p.color.to_owned(),
            source_note: p.source.to_owned(),
        })
        .collect()
}

/// A known property that can be loaded directly, skipping click resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyProfile {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub floors: u32,
}

impl PropertyProfile {
    pub fn to_building(&self) -> Building {
        Building::new(
            self.id.as_str(),
            self.name.clone(),
            foundation::geo::LatLng::new(self.lat, self.lng),
        )
        .with_address(self.address.clone())
        .with_floor_count(self.floors)
    }
}

/// Properties that ship with the engine.
pub fn builtin_properties() -> Vec<PropertyProfile> {
    vec![
        PropertyProfile {
            id: "mgm-grand-detroit".to_owned(),
            name: "MGM Grand Detroit Hotel & Casino".to_owned(),
            address: "1777 3rd Ave, Detroit, MI 48226".to_owned(),
            lat: 42.33361,
            lng: -83.06028,
            floors: 17,
        },
        PropertyProfile {
            id: "jeffersonian-apartments".to_owned(),
            name: "Jeffersonian Apartments".to_owned(),
            address: "9000 East Jefferson Avenue, Detroit, Michigan 48214".to_owned(),
            lat: 42.3558,
            lng: -82.9867,
            floors: 30,
        },
        PropertyProfile {
            id: "coleman-young-municipal".to_owned(),
            name: "Coleman A. Young Municipal Building".to_owned(),
            address: "2 Woodward Ave, Detroit, MI 48226".to_owned(),
            lat: 42.3295,
            lng: -83.0442,
            floors: 20,
        },
    ]
}

pub fn builtin_property(id: &str) -> Option<PropertyProfile> {
    builtin_properties().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::{analysis_markers_around, builtin_property};

    #[test]
    fn six_markers_around_the_building() {
        let b = builtin_property("mgm-grand-detroit").unwrap().to_building();
        let markers = analysis_markers_around(&b);
        assert_eq!(markers.len(), 6);
        assert_eq!(markers[0].id.as_str(), "mgm-grand-detroit-analysis-1");
        assert_eq!(markers[0].label, "Energy Research");
        assert!((markers[4].position.lng - (b.location.lng + 0.0012)).abs() < 1e-12);
        assert_eq!(markers[5].position.lat, b.location.lat);
    }

    #[test]
    fn builtin_lookup() {
        assert_eq!(builtin_property("jeffersonian-apartments").unwrap().floors, 30);
        assert!(builtin_property("nope").is_none());
    }
}
