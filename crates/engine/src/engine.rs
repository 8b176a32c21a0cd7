use std::collections::VecDeque;

use foundation::geo::LatLng;
use foundation::ids::BuildingId;
use foundation::time::{Delay, Millis};
use layers::{AnnotationSync, MapSurface, MarkerKey, SurfaceError, SyncStats};
use runtime::{EventBus, Metrics, PendingTracker, Resolution, SubscriptionId, TimerQueue};
use scene::entity::{Building, EntityKind, Feature};
use scene::picking::{ClickResolution, resolve_click};
use scene::procgen::generate_windows;
use scene::store::EntityStore;
use tracing::{debug, info, warn};
use viewport::{
    HighDetailSequence, InputRouter, KeyEvent, MapType, ObservedCamera, Outcome, PointerEvent,
    Reconfigure, RenderingMode, Routed, Viewport, ViewportCommand, ViewportMachine,
};

use crate::analysis::{PropertyProfile, analysis_markers_around};
use crate::config::EngineConfig;
use crate::data::{DataAccess, DataError, DetectionTicket};
use crate::events::EngineEvent;

/// Step sizes of the on-screen camera buttons.
pub const BUTTON_ROTATE_STEP: f64 = 45.0;
pub const BUTTON_TILT_STEP: f64 = 15.0;
pub const BUTTON_ZOOM_STEP: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TimerTask {
    HighDetail { run: u64 },
}

#[derive(Debug)]
struct HighDetailRun {
    id: u64,
    sequence: HighDetailSequence,
}

/// How a building ended up with (or is waiting for) features.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Population {
    AlreadyPresent,
    /// Stored records from the data collaborator.
    Stored(usize),
    /// A detection request is in flight.
    DetectionPending,
    Synthetic(usize),
    /// Unknown building, or the store rejected every source.
    Unavailable,
}

/// The annotation and viewport engine.
///
/// Owns the viewport, the entity store and the marker reconciler, and talks
/// to a [`MapSurface`] and a [`DataAccess`] collaborator. Everything runs on
/// the caller's thread; time only moves when the host calls
/// [`Engine::advance_to`]. No command fails: collaborator errors are logged,
/// counted in [`Engine::metrics`], and leave the visible state unchanged.
pub struct Engine<S, D> {
    config: EngineConfig,
    surface: S,
    data: D,
    viewport: ViewportMachine,
    input: InputRouter,
    store: EntityStore,
    sync: AnnotationSync,
    bus: EventBus<EngineEvent>,
    timers: TimerQueue<TimerTask>,
    detections: PendingTracker<BuildingId>,
    high_detail: Option<HighDetailRun>,
    next_run: u64,
    show_features: bool,
    ground_view: Option<LatLng>,
    announced_revision: u64,
    now: Millis,
    metrics: Metrics,
}

impl<S: MapSurface, D: DataAccess> Engine<S, D> {
    pub fn create(config: EngineConfig, surface: S, data: D) -> Self {
        let config = config.validated();
        let mut engine = Self {
            viewport: ViewportMachine::new(config.viewport.clone()),
            input: InputRouter::new(config.input.clone()),
            store: EntityStore::with_history_capacity(config.history_capacity),
            bus: EventBus::new().with_log_capacity(config.event_log_capacity),
            config,
            surface,
            data,
            sync: AnnotationSync::new(),
            timers: TimerQueue::new(),
            detections: PendingTracker::new(),
            high_detail: None,
            next_run: 0,
            show_features: false,
            ground_view: None,
            announced_revision: 0,
            now: Millis::ZERO,
            metrics: Metrics::new(),
        };
        info!(surface_ready = engine.surface.is_ready(), "engine created");
        engine.surface_ready();
        engine
    }

    /// Tear down: cancel timed and pending work, remove every marker, close
    /// the ground view, drop subscribers, and hand the collaborators back.
    pub fn dispose(mut self) -> (S, D) {
        self.cancel_high_detail();
        self.timers.clear();
        self.detections.cancel_all();
        if self.ground_view.take().is_some()
            && let Err(e) = self.surface.close_ground_view()
        {
            debug!(error = %e, "ground view not closed on dispose");
        }
        match self.sync.detach(&mut self.surface) {
            Ok(removed) => debug!(removed, "markers detached"),
            Err(e) => debug!(error = %e, "markers not detached on dispose"),
        }
        self.bus.clear();
        info!("engine disposed");
        (self.surface, self.data)
    }

    /// Push the full state to the surface. Hosts call this once the renderer
    /// finished initializing.
    pub fn surface_ready(&mut self) {
        self.push_options();
        self.push_view();
        self.sync_annotations();
    }

    /// The renderer was rebuilt and lost its markers and ground view.
    pub fn surface_recreated(&mut self) {
        info!("surface recreated; replaying state");
        self.sync.forget();
        if self.ground_view.take().is_some() {
            self.bus.emit(EngineEvent::GroundViewChanged { open: false });
        }
        self.surface_ready();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport.viewport()
    }

    pub fn viewport_machine(&self) -> &ViewportMachine {
        &self.viewport
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn show_features(&self) -> bool {
        self.show_features
    }

    pub fn enhanced_rotation(&self) -> bool {
        self.input.enhanced_rotation()
    }

    pub fn ground_view(&self) -> Option<LatLng> {
        self.ground_view
    }

    pub fn live_markers(&self) -> usize {
        self.sync.len()
    }

    pub fn pending_detections(&self) -> usize {
        self.detections.in_flight()
    }

    pub fn high_detail_running(&self) -> bool {
        self.high_detail
            .as_ref()
            .is_some_and(|r| !r.sequence.is_done())
    }

    /// Outcome of the most recent high-detail sequence, once it finished.
    pub fn high_detail_outcome(&self) -> Option<Outcome> {
        self.high_detail.as_ref().and_then(|r| r.sequence.outcome())
    }

    // ---- subscriptions ----

    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &VecDeque<EngineEvent> {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.bus.drain()
    }

    // ---- clock ----

    /// Move the clock forward and run every timer due by `target`, each at
    /// its own due time.
    pub fn advance_to(&mut self, target: Millis) {
        while let Some((_, due, task)) = self.timers.pop_due(target) {
            self.now = self.now.max(due);
            self.fire(task);
        }
        self.now = self.now.max(target);
    }

    pub fn advance_by(&mut self, delay: Delay) {
        self.advance_to(self.now.saturating_add(delay));
    }

    fn fire(&mut self, task: TimerTask) {
        match task {
            TimerTask::HighDetail { run } => self.step_high_detail(run),
        }
    }

    // ---- viewport ----

    pub fn apply(&mut self, command: ViewportCommand) -> bool {
        let changed = self.viewport.apply(&command);
        if changed {
            self.push_view();
            self.emit_viewport();
        }
        changed
    }

    pub fn set_center(&mut self, center: LatLng) -> bool {
        self.apply(ViewportCommand::SetCenter(center))
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.apply(ViewportCommand::SetZoom(zoom))
    }

    pub fn zoom_by(&mut self, delta: f64) -> bool {
        self.apply(ViewportCommand::ZoomBy(delta))
    }

    pub fn rotate_by(&mut self, delta: f64) -> bool {
        self.apply(ViewportCommand::RotateBy(delta))
    }

    pub fn tilt_by(&mut self, delta: f64) -> bool {
        self.apply(ViewportCommand::TiltBy(delta))
    }

    pub fn set_map_type(&mut self, map_type: MapType) -> bool {
        self.apply(ViewportCommand::SetMapType(map_type))
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_by(BUTTON_ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_by(-BUTTON_ZOOM_STEP)
    }

    pub fn rotate_left(&mut self) -> bool {
        self.rotate_by(-BUTTON_ROTATE_STEP)
    }

    pub fn rotate_right(&mut self) -> bool {
        self.rotate_by(BUTTON_ROTATE_STEP)
    }

    pub fn tilt_up(&mut self) -> bool {
        self.tilt_by(BUTTON_TILT_STEP)
    }

    pub fn tilt_down(&mut self) -> bool {
        self.tilt_by(-BUTTON_TILT_STEP)
    }

    pub fn toggle_3d(&mut self) -> bool {
        let changed = self.viewport.toggle_3d();
        if changed {
            self.push_view();
            self.emit_viewport();
        }
        changed
    }

    /// Back to the canonical overview. Cancels a running high-detail sequence.
    pub fn reset_view(&mut self) -> bool {
        self.cancel_high_detail();
        let changed = self.viewport.reset();
        self.push_options();
        self.push_view();
        if changed {
            self.emit_viewport();
        }
        changed
    }

    /// Renderer change notification (zoom, tilt or heading moved on its own).
    pub fn observe_camera(&mut self, observed: ObservedCamera) -> bool {
        let changed = self.viewport.observe(observed);
        if changed {
            self.emit_viewport();
        }
        changed
    }

    /// Start the best-effort attempt/verify/fallback sequence. A sequence
    /// already running is cancelled first.
    pub fn force_high_detail(&mut self) {
        self.cancel_high_detail();
        self.next_run += 1;
        let run = self.next_run;
        let sequence =
            HighDetailSequence::new(self.config.high_detail.clone(), self.viewport.epoch());
        self.timers
            .schedule(self.now, sequence.first_wait(), TimerTask::HighDetail { run });
        self.high_detail = Some(HighDetailRun { id: run, sequence });
        self.metrics.inc("high_detail.started");
        info!(run, "high detail sequence started");
    }

    fn cancel_high_detail(&mut self) {
        self.timers
            .cancel_where(|t| matches!(t, TimerTask::HighDetail { .. }));
        if let Some(run) = self.high_detail.as_mut()
            && !run.sequence.is_done()
        {
            run.sequence.cancel();
            debug!(run = run.id, "high detail sequence cancelled");
            self.metrics.inc("high_detail.cancelled");
            self.bus.emit(EngineEvent::HighDetailFinished {
                outcome: Outcome::Cancelled,
            });
        }
    }

    fn step_high_detail(&mut self, run: u64) {
        let epoch = self.viewport.epoch();
        let verify = match self.high_detail.as_ref() {
            Some(r) if r.id == run && !r.sequence.is_done() => {
                if r.sequence.epoch() != epoch {
                    // The viewport was reset underneath the sequence.
                    self.cancel_high_detail();
                    return;
                }
                r.sequence.awaits_verification()
            }
            _ => {
                self.metrics.inc("timers.stale");
                debug!(run, "stale high detail timer discarded");
                return;
            }
        };

        let observed_tilt = if verify { self.read_tilt() } else { None };
        let Some(r) = self.high_detail.as_mut() else {
            return;
        };
        let step = r.sequence.on_timer(observed_tilt);
        let fallbacks = r.sequence.fallbacks();

        if let Some(apply) = step.apply {
            self.reconfigure(apply);
        }
        if let Some(wait) = step.wait {
            self.timers
                .schedule(self.now, wait, TimerTask::HighDetail { run });
        }
        if let Some(outcome) = step.outcome {
            match outcome {
                Outcome::Honored { .. } => {
                    self.metrics.inc("high_detail.honored");
                    info!(fallbacks, "renderer honored high detail");
                }
                Outcome::GaveUp => {
                    self.metrics.inc("high_detail.gave_up");
                    warn!(fallbacks, "renderer refused high detail; giving up");
                }
                Outcome::Cancelled => {}
            }
            self.bus.emit(EngineEvent::HighDetailFinished { outcome });
        }
    }

    /// Read the renderer camera, fold it into the viewport, and return tilt.
    fn read_tilt(&mut self) -> Option<f64> {
        match self.surface.read_camera() {
            Ok(camera) => {
                self.observe_camera(camera);
                camera.tilt
            }
            Err(e) => {
                self.surface_error("read_camera", &e);
                None
            }
        }
    }

    fn reconfigure(&mut self, apply: Reconfigure) {
        let target = ViewportCommand::Orient {
            heading: self.config.high_detail.target_heading,
            tilt: self.config.high_detail.target_tilt,
            zoom: self.config.high_detail.target_zoom,
        };
        let mut changed = match apply {
            Reconfigure::Attempt => {
                let mode = self.viewport.set_rendering_mode(RenderingMode::Vector);
                self.viewport.set_map_type(MapType::Road) | mode
            }
            Reconfigure::DropMapId => {
                self.viewport.drop_map_id();
                false
            }
            Reconfigure::SwitchToSatellite => self.viewport.set_map_type(MapType::Satellite),
        };
        changed |= self.viewport.apply(&target);
        self.metrics.inc("high_detail.reconfigurations");
        debug!(?apply, "high detail reconfiguration");

        // Re-push even when unchanged: the renderer may have dropped the last request.
        self.push_options();
        self.push_view();
        if changed {
            self.emit_viewport();
        }
    }

    // ---- input ----

    pub fn handle_key(&mut self, event: KeyEvent) {
        self.metrics.inc("input.keys");
        let routed = self.input.route_key(event);
        self.dispatch(routed);
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        self.metrics.inc("input.pointer");
        let routed = self.input.route_pointer(event, self.viewport.viewport());
        self.dispatch(routed);
    }

    fn dispatch(&mut self, routed: Routed) {
        match routed {
            Routed::Viewport(command) => {
                self.apply(command);
            }
            Routed::Click(at) => {
                self.click(at);
            }
            Routed::ExitImmersive => {
                self.exit_ground_view();
            }
            Routed::EnhancedRotation(active) => {
                self.bus.emit(EngineEvent::EnhancedRotationChanged { active });
            }
            Routed::Ignored => {}
        }
    }

    /// A click on a marker. Building markers select their building.
    pub fn marker_clicked(&mut self, key: &MarkerKey) -> bool {
        match key.kind {
            EntityKind::Building => self.select(&BuildingId::new(key.id.as_str())),
            EntityKind::Feature | EntityKind::AnalysisMarker => false,
        }
    }

    // ---- entities ----

    /// Resolve a map click to the nearest building, or create one there, and
    /// select it. Returns the selected building.
    pub fn click(&mut self, at: LatLng) -> Option<BuildingId> {
        if !at.is_finite() {
            self.metrics.inc("clicks.ignored");
            return None;
        }
        match resolve_click(self.store.buildings(), at, self.config.proximity_deg) {
            ClickResolution::Existing(hit) => {
                self.metrics.inc("clicks.matched");
                debug!(building = %hit.building, distance = hit.distance, "click matched building");
                self.select(&hit.building).then_some(hit.building)
            }
            ClickResolution::Create(new) => {
                let building = match self.data.save_building(new) {
                    Ok(b) => b,
                    Err(e) => {
                        self.data_error("save_building", &e);
                        return None;
                    }
                };
                let id = building.id.clone();
                if let Err(e) = self.store.upsert_building(building) {
                    warn!(error = %e, "saved building rejected by store");
                    return None;
                }
                self.metrics.inc("clicks.created");
                info!(building = %id, "building created from click");
                self.select(&id).then_some(id)
            }
        }
    }

    /// Add or enrich a building without selecting it.
    pub fn upsert_building(&mut self, building: Building) -> bool {
        match self.store.upsert_building(building) {
            Ok(_) => {
                self.store_changed();
                true
            }
            Err(e) => {
                warn!(error = %e, "building rejected");
                false
            }
        }
    }

    pub fn remove_building(&mut self, id: &BuildingId) -> bool {
        let was_selected = self.store.selected() == Some(id);
        self.detections.cancel(id);
        if let Err(e) = self.store.remove_building(id) {
            debug!(error = %e, "remove ignored");
            return false;
        }
        if was_selected {
            self.bus.emit(EngineEvent::SelectionChanged { building: None });
        }
        self.store_changed();
        true
    }

    /// Select `id`: center on it, record it in history, show its features,
    /// and populate them if it has none. Returns `false` for unknown ids.
    pub fn select(&mut self, id: &BuildingId) -> bool {
        let Some(location) = self.store.building(id).map(|b| b.location) else {
            debug!(building = %id, "select ignored: unknown building");
            return false;
        };
        let changed = match self.store.select_building(Some(id)) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, "select failed");
                return false;
            }
        };
        if let Err(e) = self.store.add_to_recent_history(id) {
            warn!(error = %e, "history not updated");
        }
        self.metrics.inc("selections");
        self.center_camera(location);
        if self.config.show_features_on_select {
            self.set_show_features(true);
        }
        if changed {
            info!(building = %id, "building selected");
            self.bus.emit(EngineEvent::SelectionChanged {
                building: Some(id.clone()),
            });
        }
        self.populate_features(id);
        self.store_changed();
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        match self.store.select_building(None) {
            Ok(true) => {
                self.bus.emit(EngineEvent::SelectionChanged { building: None });
                self.store_changed();
                true
            }
            _ => false,
        }
    }

    /// Center the camera on a building with the selection zoom and tilt.
    pub fn center_on(&mut self, id: &BuildingId) -> bool {
        match self.store.building(id).map(|b| b.location) {
            Some(location) => {
                self.center_camera(location);
                true
            }
            None => false,
        }
    }

    fn center_camera(&mut self, at: LatLng) {
        let mut changed = self.viewport.set_center(at);
        changed |= self.viewport.set_zoom(self.config.selection_zoom);
        changed |= self.viewport.set_tilt(self.config.selection_tilt);
        if changed {
            self.push_view();
            self.emit_viewport();
        }
    }

    pub fn toggle_feature_visibility(&mut self) -> bool {
        let visible = !self.show_features;
        self.set_show_features(visible);
        self.sync_annotations();
        visible
    }

    fn set_show_features(&mut self, visible: bool) {
        if self.show_features != visible {
            self.show_features = visible;
            self.bus.emit(EngineEvent::FeatureVisibilityChanged { visible });
        }
    }

    /// Make sure `id` has features: stored records first, then a detection
    /// request, then synthetic windows.
    pub fn populate_features(&mut self, id: &BuildingId) -> Population {
        if self.store.building(id).is_none() {
            return Population::Unavailable;
        }
        if !self.store.needs_features(id) {
            return Population::AlreadyPresent;
        }
        if self.detections.is_pending(id) {
            return Population::DetectionPending;
        }

        match self.data.fetch_features(id) {
            Ok(features) if !features.is_empty() => match self.store.set_features(id, features) {
                Ok(n) => {
                    self.metrics.add("features.stored", n as u64);
                    debug!(building = %id, features = n, "stored features loaded");
                    return Population::Stored(n);
                }
                Err(e) => warn!(building = %id, error = %e, "stored features rejected"),
            },
            Ok(_) => {}
            Err(e) => self.data_error("fetch_features", &e),
        }

        if self.config.request_detection {
            let ticket = self.detections.begin(id.clone());
            match self.data.start_feature_detection(&ticket) {
                Ok(()) => {
                    self.metrics.inc("detections.started");
                    debug!(building = %id, generation = ticket.generation, "detection requested");
                    return Population::DetectionPending;
                }
                Err(DataError::Unsupported) => {
                    self.detections.cancel(id);
                }
                Err(e) => {
                    self.detections.cancel(id);
                    self.data_error("start_feature_detection", &e);
                }
            }
        }

        self.generate_features(id)
    }

    fn generate_features(&mut self, id: &BuildingId) -> Population {
        let Some(building) = self.store.building(id) else {
            return Population::Unavailable;
        };
        let windows = generate_windows(building, &self.config.layout);
        match self.store.set_features(id, windows) {
            Ok(n) => {
                self.metrics.add("features.synthetic", n as u64);
                debug!(building = %id, features = n, "synthetic windows generated");
                Population::Synthetic(n)
            }
            Err(e) => {
                warn!(building = %id, error = %e, "synthetic windows rejected");
                Population::Unavailable
            }
        }
    }

    /// Deliver the result of a detection request. Results for superseded,
    /// cancelled or removed requests are discarded and `false` is returned.
    /// An empty or failed detection falls back to synthetic windows.
    pub fn resolve_detection(
        &mut self,
        ticket: DetectionTicket,
        result: Result<Vec<Feature>, DataError>,
    ) -> bool {
        let current = self.detections.complete(&ticket) == Resolution::Current;
        if !current || self.store.building(&ticket.key).is_none() {
            self.metrics.inc("detections.stale");
            debug!(
                building = %ticket.key,
                generation = ticket.generation,
                "stale detection result discarded"
            );
            return false;
        }

        let id = ticket.key;
        match result {
            Ok(features) if !features.is_empty() => match self.store.set_features(&id, features) {
                Ok(n) => {
                    self.metrics.add("features.detected", n as u64);
                    info!(building = %id, features = n, "detected features applied");
                }
                Err(e) => {
                    warn!(building = %id, error = %e, "detected features rejected");
                    self.generate_features(&id);
                }
            },
            Ok(_) => {
                debug!(building = %id, "detection found nothing");
                self.generate_features(&id);
            }
            Err(e) => {
                self.data_error("feature_detection", &e);
                self.generate_features(&id);
            }
        }
        self.store_changed();
        true
    }

    /// Load a known property: upsert it, give it synthetic windows, select it
    /// and show its features.
    pub fn load_property(&mut self, profile: &PropertyProfile) -> Option<BuildingId> {
        let building = profile.to_building();
        let id = building.id.clone();
        if let Err(e) = self.store.upsert_building(building) {
            warn!(error = %e, property = %profile.id, "property rejected");
            return None;
        }
        self.detections.cancel(&id);
        if self.store.needs_features(&id) {
            self.generate_features(&id);
        }
        info!(building = %id, "property loaded");
        self.set_show_features(true);
        self.select(&id);
        Some(id)
    }

    /// Select `id` if needed and place the research markers around it.
    pub fn open_analysis(&mut self, id: &BuildingId) -> bool {
        if self.store.selected() != Some(id) && !self.select(id) {
            return false;
        }
        let Some(building) = self.store.building(id) else {
            return false;
        };
        let markers = analysis_markers_around(building);
        self.store.clear_analysis_markers();
        self.store.add_analysis_markers(markers);
        self.metrics.inc("analysis.opened");
        self.store_changed();
        true
    }

    pub fn close_analysis(&mut self) -> bool {
        let changed = self.store.clear_analysis_markers();
        if changed {
            self.store_changed();
        }
        changed
    }

    pub fn enter_ground_view(&mut self) -> bool {
        let at = self.viewport.viewport().center;
        match self.surface.open_ground_view(at) {
            Ok(()) => {
                if self.ground_view.replace(at).is_none() {
                    self.bus.emit(EngineEvent::GroundViewChanged { open: true });
                }
                true
            }
            Err(e) => {
                self.surface_error("open_ground_view", &e);
                false
            }
        }
    }

    pub fn exit_ground_view(&mut self) -> bool {
        if self.ground_view.is_none() {
            return false;
        }
        match self.surface.close_ground_view() {
            Ok(()) => {
                self.ground_view = None;
                self.bus.emit(EngineEvent::GroundViewChanged { open: false });
                true
            }
            Err(e) => {
                self.surface_error("close_ground_view", &e);
                false
            }
        }
    }

    // ---- plumbing ----

    /// Run one reconciliation pass. `None` when the surface is not ready; the
    /// next store change retries.
    pub fn sync_annotations(&mut self) -> Option<SyncStats> {
        match self.sync.sync(&self.store, self.show_features, &mut self.surface) {
            Ok(stats) => {
                self.metrics.inc("sync.passes");
                self.metrics.add("markers.created", stats.created as u64);
                self.metrics.add("markers.updated", stats.updated as u64);
                self.metrics.add("markers.removed", stats.removed as u64);
                self.metrics.set_gauge("markers.live", self.sync.len() as i64);
                Some(stats)
            }
            Err(SurfaceError::Unavailable) => {
                self.metrics.inc("sync.deferred");
                debug!("surface not ready; annotations deferred");
                None
            }
            Err(e) => {
                self.surface_error("sync", &e);
                None
            }
        }
    }

    fn store_changed(&mut self) {
        let revision = self.store.revision();
        if revision != self.announced_revision {
            self.announced_revision = revision;
            self.bus.emit(EngineEvent::EntitiesChanged { revision });
        }
        self.metrics
            .set_gauge("history.len", self.store.history().len() as i64);
        self.sync_annotations();
    }

    fn push_view(&mut self) {
        if let Err(e) = self.surface.set_view(self.viewport.viewport()) {
            self.surface_error("set_view", &e);
        }
    }

    fn push_options(&mut self) {
        if let Err(e) = self.surface.set_options(self.viewport.options()) {
            self.surface_error("set_options", &e);
        }
    }

    fn emit_viewport(&mut self) {
        self.bus.emit(EngineEvent::ViewportChanged {
            viewport: self.viewport.viewport().clone(),
        });
    }

    fn surface_error(&mut self, op: &'static str, e: &SurfaceError) {
        if *e == SurfaceError::Unavailable {
            self.metrics.inc("surface.unavailable");
            debug!(op, "surface not ready");
        } else {
            self.metrics.inc("surface.errors");
            warn!(op, error = %e, "surface call failed");
        }
    }

    fn data_error(&mut self, op: &'static str, e: &DataError) {
        self.metrics.inc("data.errors");
        warn!(op, error = %e, "data call failed");
    }
}

impl<S, D> std::fmt::Debug for Engine<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.now)
            .field("viewport", self.viewport.viewport())
            .field("revision", &self.store.revision())
            .field("live_markers", &self.sync.len())
            .finish()
    }
}
