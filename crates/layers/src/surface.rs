use std::cell::Cell;
use std::collections::BTreeMap;

use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};
use viewport::{ObservedCamera, RendererOptions, Viewport};

use crate::marker::{MarkerKey, VisualMarker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The renderer handle is missing or not initialized yet.
    Unavailable,
    DuplicateMarker(MarkerKey),
    UnknownMarker(MarkerKey),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::Unavailable => write!(f, "map surface unavailable"),
            SurfaceError::DuplicateMarker(k) => write!(f, "marker {k} already exists"),
            SurfaceError::UnknownMarker(k) => write!(f, "marker {k} does not exist"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// The map-rendering collaborator.
///
/// Implementations wrap a real renderer; the engine only talks to this trait.
/// Every method fails with [`SurfaceError::Unavailable`] until the renderer is
/// ready.
pub trait MapSurface {
    fn is_ready(&self) -> bool;

    /// Push center, zoom, tilt, heading and map type.
    fn set_view(&mut self, view: &Viewport) -> Result<(), SurfaceError>;

    /// Read back what the renderer actually shows. Renderers are free to
    /// ignore requests (notably tilt), so this can differ from the last
    /// `set_view`.
    fn read_camera(&self) -> Result<ObservedCamera, SurfaceError>;

    fn set_options(&mut self, options: &RendererOptions) -> Result<(), SurfaceError>;

    fn create_marker(&mut self, marker: &VisualMarker) -> Result<(), SurfaceError>;
    fn update_marker(&mut self, marker: &VisualMarker) -> Result<(), SurfaceError>;
    fn remove_marker(&mut self, key: &MarkerKey) -> Result<(), SurfaceError>;

    /// Open the immersive ground-level panorama at `at`.
    fn open_ground_view(&mut self, at: LatLng) -> Result<(), SurfaceError>;
    fn close_ground_view(&mut self) -> Result<(), SurfaceError>;
}

/// When a [`RecordingSurface`] honors requested tilt.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltPolicy {
    #[default]
    Honor,
    /// Always reports tilt 0.
    Refuse,
    /// Honors tilt only once no vector map id is configured.
    RequireNoMapId,
    /// Honors tilt only on satellite or hybrid imagery.
    RequireImagery,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceCalls {
    pub view_sets: u64,
    pub option_sets: u64,
    pub camera_reads: u64,
    pub markers_created: u64,
    pub markers_updated: u64,
    pub markers_removed: u64,
    pub ground_opened: u64,
    pub ground_closed: u64,
}

impl SurfaceCalls {
    pub fn marker_ops(&self) -> u64 {
        self.markers_created + self.markers_updated + self.markers_removed
    }
}

/// In-memory [`MapSurface`] that keeps the last applied state and counts calls.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ready: bool,
    tilt_policy: TiltPolicy,
    view: Option<Viewport>,
    options: Option<RendererOptions>,
    markers: BTreeMap<MarkerKey, VisualMarker>,
    ground_view: Option<LatLng>,
    calls: SurfaceCalls,
    camera_reads: Cell<u64>,
}

impl RecordingSurface {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn not_ready() -> Self {
        Self::default()
    }

    pub fn with_tilt_policy(mut self, policy: TiltPolicy) -> Self {
        self.tilt_policy = policy;
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn tilt_policy(&self) -> TiltPolicy {
        self.tilt_policy
    }

    pub fn calls(&self) -> SurfaceCalls {
        SurfaceCalls {
            camera_reads: self.camera_reads.get(),
            ..self.calls
        }
    }

    pub fn view(&self) -> Option<&Viewport> {
        self.view.as_ref()
    }

    pub fn options(&self) -> Option<&RendererOptions> {
        self.options.as_ref()
    }

    pub fn markers(&self) -> &BTreeMap<MarkerKey, VisualMarker> {
        &self.markers
    }

    pub fn marker(&self, key: &MarkerKey) -> Option<&VisualMarker> {
        self.markers.get(key)
    }

    pub fn ground_view(&self) -> Option<LatLng> {
        self.ground_view
    }

    fn honors_tilt(&self) -> bool {
        match self.tilt_policy {
            TiltPolicy::Honor => true,
            TiltPolicy::Refuse => false,
            TiltPolicy::RequireNoMapId => self.options.as_ref().is_some_and(|o| o.map_id.is_none()),
            TiltPolicy::RequireImagery => {
                self.view.as_ref().is_some_and(|v| v.map_type.is_imagery())
            }
        }
    }

    fn check_ready(&self) -> Result<(), SurfaceError> {
        if self.ready {
            Ok(())
        } else {
            Err(SurfaceError::Unavailable)
        }
    }
}

impl MapSurface for RecordingSurface {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_view(&mut self, view: &Viewport) -> Result<(), SurfaceError> {
        self.check_ready()?;
        self.view = Some(view.clone());
        self.calls.view_sets += 1;
        Ok(())
    }

    fn read_camera(&self) -> Result<ObservedCamera, SurfaceError> {
        self.check_ready()?;
        self.camera_reads.set(self.camera_reads.get() + 1);
        let Some(view) = &self.view else {
            return Ok(ObservedCamera::default());
        };
        let tilt = if self.honors_tilt() { view.tilt } else { 0.0 };
        Ok(ObservedCamera {
            center: Some(view.center),
            zoom: Some(view.zoom),
            tilt: Some(tilt),
            heading: Some(view.heading),
        })
    }

    fn set_options(&mut self, options: &RendererOptions) -> Result<(), SurfaceError> {
        self.check_ready()?;
        self.options = Some(options.clone());
        self.calls.option_sets += 1;
        Ok(())
    }

    fn create_marker(&mut self, marker: &VisualMarker) -> Result<(), SurfaceError> {
        self.check_ready()?;
        if self.markers.contains_key(&marker.key) {
            return Err(SurfaceError::DuplicateMarker(marker.key.clone()));
        }
        self.markers.insert(marker.key.clone(), marker.clone());
        self.calls.markers_created += 1;
        Ok(())
    }

    fn update_marker(&mut self, marker: &VisualMarker) -> Result<(), SurfaceError> {
        self.check_ready()?;
        let slot = self
            .markers
            .get_mut(&marker.key)
            .ok_or_else(|| SurfaceError::UnknownMarker(marker.key.clone()))?;
        *slot = marker.clone();
        self.calls.markers_updated += 1;
        Ok(())
    }

    fn remove_marker(&mut self, key: &MarkerKey) -> Result<(), SurfaceError> {
        self.check_ready()?;
        self.markers
            .remove(key)
            .ok_or_else(|| SurfaceError::UnknownMarker(key.clone()))?;
        self.calls.markers_removed += 1;
        Ok(())
    }

    fn open_ground_view(&mut self, at: LatLng) -> Result<(), SurfaceError> {
        self.check_ready()?;
        self.ground_view = Some(at);
        self.calls.ground_opened += 1;
        Ok(())
    }

    fn close_ground_view(&mut self) -> Result<(), SurfaceError> {
        self.check_ready()?;
        if self.ground_view.take().is_some() {
            self.calls.ground_closed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MapSurface, RecordingSurface, SurfaceError, TiltPolicy};
    use viewport::{MapType, RendererOptions, RenderingMode, ViewportConfig, ViewportMachine};

    #[test]
    fn not_ready_surface_rejects_everything() {
        let mut s = RecordingSurface::not_ready();
        let m = ViewportMachine::new(ViewportConfig::default());
        assert_eq!(s.set_view(m.viewport()), Err(SurfaceError::Unavailable));
        assert_eq!(s.read_camera(), Err(SurfaceError::Unavailable));
        assert_eq!(s.calls().view_sets, 0);
    }

    #[test]
    fn tilt_policy_gates_reported_tilt() {
        let mut m = ViewportMachine::new(ViewportConfig::default());
        m.set_tilt(60.0);

        let mut s = RecordingSurface::ready().with_tilt_policy(TiltPolicy::RequireNoMapId);
        s.set_view(m.viewport()).unwrap();
        s.set_options(m.options()).unwrap();
        assert_eq!(s.read_camera().unwrap().tilt, Some(0.0));

        s.set_options(&RendererOptions::interactive(RenderingMode::Vector, None))
            .unwrap();
        assert_eq!(s.read_camera().unwrap().tilt, Some(60.0));
        assert_eq!(s.calls().camera_reads, 2);

        let mut s = RecordingSurface::ready().with_tilt_policy(TiltPolicy::RequireImagery);
        s.set_view(m.viewport()).unwrap();
        assert_eq!(s.read_camera().unwrap().tilt, Some(0.0));
        m.set_map_type(MapType::Satellite);
        s.set_view(m.viewport()).unwrap();
        assert_eq!(s.read_camera().unwrap().tilt, Some(60.0));
    }

    #[test]
    fn closing_ground_view_twice_counts_once() {
        let mut s = RecordingSurface::ready();
        s.open_ground_view(foundation::geo::LatLng::new(1.0, 2.0)).unwrap();
        s.close_ground_view().unwrap();
        s.close_ground_view().unwrap();
        assert_eq!(s.calls().ground_closed, 1);
        assert_eq!(s.ground_view(), None);
    }
}
