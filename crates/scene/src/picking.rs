use foundation::geo::{LatLng, degree_distance};
use foundation::ids::BuildingId;
use foundation::math::precision::stable_total_cmp_f64;

use crate::entity::{Building, NewBuilding};

/// Default click radius in coordinate degrees (roughly 100 m at mid latitudes).
pub const DEFAULT_PROXIMITY_DEG: f64 = 0.001;

pub const PLACEHOLDER_NAME: &str = "Selected Building";

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub building: BuildingId,
    pub distance: f64,
}

/// Nearest building strictly closer than `threshold` degrees to `at`.
///
/// Distance is [`degree_distance`], a flat-earth approximation. A building
/// exactly `threshold` away does not match.
///
/// Ordering contract:
/// - The smallest distance wins.
/// - If several buildings are at the same distance, the lowest id wins.
pub fn pick_building<'a, I>(buildings: I, at: LatLng, threshold: f64) -> Option<PickHit>
where
    I: IntoIterator<Item = &'a Building>,
{
    if !at.is_finite() || threshold.is_nan() || threshold < 0.0 {
        return None;
    }

    let mut best: Option<(f64, &BuildingId)> = None;
    for b in buildings {
        let d = degree_distance(at, b.location);
        if d.is_nan() || d >= threshold {
            continue;
        }
        best = match best {
            None => Some((d, &b.id)),
            Some((bd, bid)) => {
                let ord = stable_total_cmp_f64(d, bd).then_with(|| b.id.cmp(bid));
                if ord.is_lt() {
                    Some((d, &b.id))
                } else {
                    Some((bd, bid))
                }
            }
        };
    }

    best.map(|(distance, id)| PickHit {
        building: id.clone(),
        distance,
    })
}

/// What a map click means for the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickResolution {
    Existing(PickHit),
    /// Nothing nearby: a new building should be created here.
    Create(NewBuilding),
}

pub fn resolve_click<'a, I>(buildings: I, at: LatLng, threshold: f64) -> ClickResolution
where
    I: IntoIterator<Item = &'a Building>,
{
    match pick_building(buildings, at, threshold) {
        Some(hit) => ClickResolution::Existing(hit),
        None => ClickResolution::Create(placeholder_building(at)),
    }
}

/// Placeholder record for a building created from a bare click.
pub fn placeholder_building(at: LatLng) -> NewBuilding {
    NewBuilding {
        name: PLACEHOLDER_NAME.to_owned(),
        address: Some(at.to_string()),
        location: at,
        external_ref: None,
        floor_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ClickResolution, DEFAULT_PROXIMITY_DEG, pick_building, resolve_click};
    use crate::entity::Building;
    use foundation::geo::LatLng;

    fn b(id: &str, lat: f64, lng: f64) -> Building {
        Building::new(id, id, LatLng::new(lat, lng))
    }

    #[test]
    fn click_near_existing_building_resolves_to_it() {
        let buildings = vec![b("a", 42.0, -83.0)];
        let at = LatLng::new(42.0005, -83.0);
        match resolve_click(&buildings, at, DEFAULT_PROXIMITY_DEG) {
            ClickResolution::Existing(hit) => assert_eq!(hit.building.as_str(), "a"),
            other => panic!("expected existing, got {other:?}"),
        }
    }

    #[test]
    fn far_click_creates_placeholder() {
        let buildings = vec![b("a", 42.0, -83.0)];
        let at = LatLng::new(42.01, -83.0);
        let ClickResolution::Create(new) = resolve_click(&buildings, at, DEFAULT_PROXIMITY_DEG)
        else {
            panic!("expected create");
        };
        assert_eq!(new.name, "Selected Building");
        assert_eq!(new.address.as_deref(), Some("42.010000, -83.000000"));
        assert_eq!(new.location, at);
    }

    #[test]
    fn threshold_is_exclusive() {
        let buildings = vec![b("a", 0.0, 0.0)];
        let at = LatLng::new(0.0, 0.5);
        assert_eq!(pick_building(&buildings, at, 0.5), None);
        assert!(pick_building(&buildings, at, 0.5000001).is_some());
    }

    #[test]
    fn nearest_building_wins() {
        let buildings = vec![b("a", 42.0, -83.0), b("b", 42.0002, -83.0)];
        let hit = pick_building(&buildings, LatLng::new(42.00015, -83.0), 0.001).unwrap();
        assert_eq!(hit.building.as_str(), "b");
    }

    #[test]
    fn equidistant_tie_goes_to_lowest_id() {
        let buildings = vec![b("z", 0.0005, 0.0), b("m", -0.0005, 0.0)];
        let hit = pick_building(&buildings, LatLng::new(0.0, 0.0), 0.001).unwrap();
        assert_eq!(hit.building.as_str(), "m");

        let reversed: Vec<Building> = buildings.into_iter().rev().collect();
        let hit = pick_building(&reversed, LatLng::new(0.0, 0.0), 0.001).unwrap();
        assert_eq!(hit.building.as_str(), "m");
    }

    #[test]
    fn non_finite_click_matches_nothing() {
        let buildings = vec![b("a", 42.0, -83.0)];
        assert!(pick_building(&buildings, LatLng::new(f64::NAN, -83.0), 0.001).is_none());
    }
}
