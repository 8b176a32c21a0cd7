//! Scripted sessions: a JSON list of steps replayed against an engine wired to
//! the recording surface and the in-memory data backend.

use std::collections::BTreeMap;

use engine::{Engine, EngineConfig, InMemoryDataAccess, builtin_property};
use foundation::geo::LatLng;
use foundation::ids::BuildingId;
use foundation::time::Delay;
use layers::{RecordingSurface, SurfaceCalls, TiltPolicy};
use runtime::MetricsSnapshot;
use scene::entity::{EntityKind, FeatureKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use viewport::{
    Key, KeyEvent, MapType, Modifiers, Outcome, PointerButton, PointerEvent, RendererOptions,
    Viewport,
};

pub type ScriptEngine = Engine<RecordingSurface, InMemoryDataAccess>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SurfaceSetup {
    /// Start with an uninitialized renderer.
    pub not_ready: bool,
    pub tilt_policy: TiltPolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    pub surface: SurfaceSetup,
    /// Drop the detection pipeline so new buildings go straight to synthetic
    /// windows.
    pub no_detection: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    ZoomIn,
    ZoomOut,
    RotateLeft,
    RotateRight,
    TiltUp,
    TiltDown,
    Toggle3d,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Click {
        lat: f64,
        lng: f64,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        release: bool,
    },
    Drag {
        from: [f64; 2],
        to: [f64; 2],
        #[serde(default = "primary")]
        button: PointerButton,
    },
    Button {
        button: Button,
    },
    MapType {
        map_type: MapType,
    },
    Advance {
        ms: u64,
    },
    Select {
        id: String,
    },
    ToggleFeatures,
    ForceHighDetail,
    /// Open analysis for `id`, or for the selected building.
    OpenAnalysis {
        #[serde(default)]
        id: Option<String>,
    },
    CloseAnalysis,
    LoadProperty {
        id: String,
    },
    GroundView {
        open: bool,
    },
    /// Answer every queued detection request with the backend's result.
    ResolveDetections,
    SurfaceReady,
}

fn primary() -> PointerButton {
    PointerButton::Primary
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkerCounts {
    pub buildings: usize,
    pub features: usize,
    pub analysis: usize,
}

/// Final state after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub now_ms: u64,
    pub viewport: Viewport,
    pub options: RendererOptions,
    pub selected: Option<BuildingId>,
    pub history: Vec<BuildingId>,
    pub buildings: usize,
    pub features: usize,
    pub show_features: bool,
    pub markers: MarkerCounts,
    /// blake3 over every live marker's attribute hash, in key order.
    pub marker_digest: String,
    pub surface_calls: SurfaceCalls,
    pub high_detail: Option<Outcome>,
    pub events: usize,
    pub metrics: MetricsSnapshot,
}

pub fn parse_script(text: &str) -> Result<Script, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn engine_for(script: &Script, config: EngineConfig) -> ScriptEngine {
    let mut surface = RecordingSurface::ready().with_tilt_policy(script.surface.tilt_policy);
    surface.set_ready(!script.surface.not_ready);
    let mut data = InMemoryDataAccess::sequential();
    if script.no_detection {
        data = data.without_detection();
    }
    Engine::create(config, surface, data)
}

/// Run `script` to the end. Unknown building or property ids are errors;
/// everything else is absorbed by the engine.
pub fn replay(script: &Script, config: EngineConfig) -> Result<Report, String> {
    let mut engine = engine_for(script, config);
    for (i, step) in script.steps.iter().enumerate() {
        debug!(index = i, ?step, "step");
        run_step(&mut engine, step).map_err(|e| format!("step {}: {e}", i + 1))?;
    }
    info!(steps = script.steps.len(), "script finished");
    Ok(report(&engine))
}

pub fn run_step(engine: &mut ScriptEngine, step: &Step) -> Result<(), String> {
    match step {
        Step::Click { lat, lng } => {
            engine.click(LatLng::new(*lat, *lng));
        }
        Step::Key {
            key,
            modifiers,
            release,
        } => {
            let key = Key::from_name(key);
            let event = if *release {
                KeyEvent::released(key, *modifiers)
            } else {
                KeyEvent::pressed(key, *modifiers)
            };
            engine.handle_key(event);
        }
        Step::Drag { from, to, button } => {
            engine.handle_pointer(PointerEvent::Down {
                pos: *from,
                button: *button,
            });
            engine.handle_pointer(PointerEvent::Move { pos: *to });
            engine.handle_pointer(PointerEvent::Up);
        }
        Step::Button { button } => {
            match button {
                Button::ZoomIn => engine.zoom_in(),
                Button::ZoomOut => engine.zoom_out(),
                Button::RotateLeft => engine.rotate_left(),
                Button::RotateRight => engine.rotate_right(),
                Button::TiltUp => engine.tilt_up(),
                Button::TiltDown => engine.tilt_down(),
                Button::Toggle3d => engine.toggle_3d(),
                Button::Reset => engine.reset_view(),
            };
        }
        Step::MapType { map_type } => {
            engine.set_map_type(*map_type);
        }
        Step::Advance { ms } => engine.advance_by(Delay::ms(*ms)),
        Step::Select { id } => {
            if !engine.select(&BuildingId::new(id.as_str())) {
                return Err(format!("unknown building {id}"));
            }
        }
        Step::ToggleFeatures => {
            engine.toggle_feature_visibility();
        }
        Step::ForceHighDetail => engine.force_high_detail(),
        Step::OpenAnalysis { id } => {
            let target = match id {
                Some(id) => BuildingId::new(id.as_str()),
                None => engine
                    .store()
                    .selected()
                    .cloned()
                    .ok_or_else(|| "open_analysis needs a selection or an id".to_string())?,
            };
            if !engine.open_analysis(&target) {
                return Err(format!("unknown building {target}"));
            }
        }
        Step::CloseAnalysis => {
            engine.close_analysis();
        }
        Step::LoadProperty { id } => {
            let profile = builtin_property(id).ok_or_else(|| format!("unknown property {id}"))?;
            engine.load_property(&profile);
        }
        Step::GroundView { open: true } => {
            engine.enter_ground_view();
        }
        Step::GroundView { open: false } => {
            engine.exit_ground_view();
        }
        Step::ResolveDetections => {
            for ticket in engine.data_mut().take_detection_requests() {
                let result = engine.data().detection_result(&ticket);
                engine.resolve_detection(ticket, result);
            }
        }
        Step::SurfaceReady => {
            engine.surface_mut().set_ready(true);
            engine.surface_ready();
        }
    }
    Ok(())
}

pub fn report(engine: &ScriptEngine) -> Report {
    let surface = engine.surface();
    let mut markers = MarkerCounts::default();
    let mut digest = blake3::Hasher::new();
    for (key, marker) in surface.markers() {
        match key.kind {
            EntityKind::Building => markers.buildings += 1,
            EntityKind::Feature => markers.features += 1,
            EntityKind::AnalysisMarker => markers.analysis += 1,
        }
        digest.update(marker.attribute_hash().as_bytes());
    }

    let store = engine.store();
    Report {
        now_ms: engine.now().0,
        viewport: engine.viewport().clone(),
        options: engine.viewport_machine().options().clone(),
        selected: store.selected().cloned(),
        history: store.history().iter().cloned().collect(),
        buildings: store.building_count(),
        features: store.feature_count(),
        show_features: engine.show_features(),
        markers,
        marker_digest: digest.finalize().to_hex().to_string(),
        surface_calls: surface.calls(),
        high_detail: engine.high_detail_outcome(),
        events: engine.events().len(),
        metrics: engine.metrics().snapshot(),
    }
}

/// Feature counts per kind label, for the `windows` command.
pub fn kind_histogram(
    kinds: impl IntoIterator<Item = FeatureKind>,
) -> BTreeMap<&'static str, usize> {
    let mut out = BTreeMap::new();
    for kind in kinds {
        *out.entry(kind.label()).or_insert(0) += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Step, parse_script, replay};
    use engine::EngineConfig;
    use pretty_assertions::assert_eq;
    use viewport::Outcome;

    #[test]
    fn steps_parse_from_tagged_json() {
        let script = parse_script(
            r#"{
                "surface": { "tilt_policy": "refuse" },
                "steps": [
                    { "op": "click", "lat": 42.3, "lng": -83.0 },
                    { "op": "key", "key": "ArrowLeft", "modifiers": { "shift": true } },
                    { "op": "button", "button": "toggle3d" },
                    { "op": "advance", "ms": 500 },
                    { "op": "toggle_features" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[3], Step::Advance { ms: 500 });
        assert!(matches!(
            &script.steps[1],
            Step::Key { modifiers, release: false, .. } if modifiers.shift
        ));
    }

    #[test]
    fn replay_reports_markers_and_selection() {
        let script = parse_script(
            r#"{
                "no_detection": true,
                "steps": [
                    { "op": "click", "lat": 42.33361, "lng": -83.06028 },
                    { "op": "open_analysis" }
                ]
            }"#,
        )
        .unwrap();
        let report = replay(&script, EngineConfig::default()).unwrap();
        assert_eq!(report.selected.as_ref().map(|b| b.as_str()), Some("building-1"));
        assert_eq!(report.markers.buildings, 1);
        assert_eq!(report.markers.features, 595);
        assert_eq!(report.markers.analysis, 6);
    }

    #[test]
    fn replay_is_deterministic() {
        let script = parse_script(
            r#"{ "steps": [
                { "op": "click", "lat": 42.0, "lng": -83.0 },
                { "op": "resolve_detections" },
                { "op": "click", "lat": 42.01, "lng": -83.0 },
                { "op": "resolve_detections" }
            ] }"#,
        )
        .unwrap();
        let a = replay(&script, EngineConfig::default()).unwrap();
        let b = replay(&script, EngineConfig::default()).unwrap();
        assert_eq!(a.marker_digest, b.marker_digest);
        assert_eq!(a.features, 2 * 595);
    }

    #[test]
    fn high_detail_runs_on_the_script_clock() {
        let script = parse_script(
            r#"{
                "surface": { "tilt_policy": "require_no_map_id" },
                "steps": [ { "op": "force_high_detail" }, { "op": "advance", "ms": 5000 } ]
            }"#,
        )
        .unwrap();
        let report = replay(&script, EngineConfig::default()).unwrap();
        assert_eq!(report.high_detail, Some(Outcome::Honored { fallbacks: 1 }));
        assert_eq!(report.options.map_id, None);
        assert_eq!(report.now_ms, 5000);
    }

    #[test]
    fn unknown_ids_fail_the_step() {
        let script = parse_script(r#"{ "steps": [ { "op": "select", "id": "nope" } ] }"#).unwrap();
        let err = replay(&script, EngineConfig::default()).unwrap_err();
        assert_eq!(err, "step 1: unknown building nope");
    }
}
