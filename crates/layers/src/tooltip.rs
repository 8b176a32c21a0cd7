use scene::entity::{AnalysisMarker, Building, Feature, Provenance};

/// Hover title and info-window body for one marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tooltip {
    pub title: String,
    pub body: String,
}

pub fn building_tooltip(building: &Building) -> Tooltip {
    let mut body = building.name.clone();
    if let Some(address) = &building.address {
        body.push('\n');
        body.push_str(address);
    }
    body.push_str("\nClick to analyze windows");
    Tooltip {
        title: building.name.clone(),
        body,
    }
}

pub fn feature_tooltip(feature: &Feature) -> Tooltip {
    let kind = feature.kind.label();
    let floor = feature.floor_index;
    let source = match feature.provenance {
        Provenance::Synthetic => "Estimated from satellite imagery and building plans",
        Provenance::Detected => "Detected from imagery",
    };
    let body = format!(
        "Window Analysis Point\n{source}\nFloor: {floor}\nType: {kind}\n\
         Est. Size: {}m x {}m\nAnalysis Score: {:.1}%\n\
         Est. Height: ~{:.1}m above ground\nFloor {floor} Research Point",
        feature.size.width,
        feature.size.height,
        feature.confidence * 100.0,
        feature.estimated_height,
    );
    Tooltip {
        title: format!("Floor {floor} - {kind} Window"),
        body,
    }
}

/// `context` is the name of the building the analysis belongs to, if any.
pub fn analysis_tooltip(marker: &AnalysisMarker, context: Option<&str>) -> Tooltip {
    let mut body = marker.label.clone();
    if let Some(name) = context {
        body.push('\n');
        body.push_str(name);
    }
    body.push('\n');
    body.push_str(&marker.source_note);
    body.push_str("\nRESEARCH DATA");
    Tooltip {
        title: marker.label.clone(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::{building_tooltip, feature_tooltip};
    use scene::entity::{Building, Feature, FeatureKind, FeatureSize, Provenance};
    use foundation::geo::LatLng;

    #[test]
    fn building_body_includes_address_when_known() {
        let b = Building::new("a", "Tower", LatLng::new(0.0, 0.0));
        assert_eq!(building_tooltip(&b).body, "Tower\nClick to analyze windows");
        let b = b.with_address("1 Main St");
        assert_eq!(
            building_tooltip(&b).body,
            "Tower\n1 Main St\nClick to analyze windows"
        );
    }

    #[test]
    fn feature_title_and_score() {
        let f = Feature {
            id: "w".into(),
            building_id: "a".into(),
            floor_index: 4,
            kind: FeatureKind::Bay,
            position: LatLng::new(0.0, 0.0),
            size: FeatureSize {
                width: 1.5,
                height: 1.2,
            },
            confidence: 0.9234,
            estimated_height: 14.0,
            provenance: Provenance::Synthetic,
        };
        let t = feature_tooltip(&f);
        assert_eq!(t.title, "Floor 4 - Bay Window");
        assert!(t.body.contains("Analysis Score: 92.3%"));
        assert!(t.body.contains("Est. Height: ~14.0m above ground"));
        assert!(t.body.contains("Estimated"));
    }
}
