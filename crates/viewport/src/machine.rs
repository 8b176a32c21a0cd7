use foundation::geo::LatLng;
use foundation::math::{clamp_finite, wrap_degrees};
use tracing::debug;

use crate::state::{
    MAX_TILT, MAX_ZOOM, MIN_TILT, MIN_ZOOM, MapType, RendererOptions, RenderingMode, Viewport,
    ViewportConfig,
};

/// A single viewport mutation, as produced by input routing or engine commands.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportCommand {
    SetCenter(LatLng),
    /// Move the center by raw degree deltas.
    PanBy { dlat: f64, dlng: f64 },
    ZoomBy(f64),
    SetZoom(f64),
    RotateBy(f64),
    SetHeading(f64),
    TiltBy(f64),
    SetTilt(f64),
    /// Combined heading and tilt change from an orbit drag.
    Orbit { heading_delta: f64, tilt_delta: f64 },
    /// Absolute orientation; used by the keyboard reset shortcut.
    Orient { heading: f64, tilt: f64, zoom: f64 },
    SetMapType(MapType),
}

/// Camera values reported back by the renderer after it settled.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ObservedCamera {
    pub center: Option<LatLng>,
    pub zoom: Option<f64>,
    pub tilt: Option<f64>,
    pub heading: Option<f64>,
}

/// Owner of the single [`Viewport`].
///
/// Every setter clamps (zoom, tilt) or wraps (heading) its target before
/// applying it and never fails; non-finite input leaves the dimension as is.
/// Setters return `true` when the viewport actually changed.
///
/// `epoch` increases on every `reset`, which lets timed sequences started
/// before the reset detect that they are stale.
#[derive(Debug, Clone)]
pub struct ViewportMachine {
    config: ViewportConfig,
    viewport: Viewport,
    options: RendererOptions,
    epoch: u64,
}

impl ViewportMachine {
    pub fn new(config: ViewportConfig) -> Self {
        let viewport = Viewport {
            center: config.home,
            zoom: clamp_zoom(config.initial_zoom).unwrap_or(MAX_ZOOM),
            tilt: clamp_tilt(config.initial_tilt).unwrap_or(MIN_TILT),
            heading: wrap_degrees(config.initial_heading).unwrap_or(0.0),
            map_type: MapType::Road,
            rendering_mode: RenderingMode::Vector,
        };
        let options = RendererOptions::interactive(RenderingMode::Vector, config.map_id.clone());
        Self {
            config,
            viewport,
            options,
            epoch: 0,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_center(&mut self, center: LatLng) -> bool {
        if !center.is_finite() {
            return false;
        }
        let center = center.normalized();
        replace(&mut self.viewport.center, center)
    }

    pub fn pan_by(&mut self, dlat: f64, dlng: f64) -> bool {
        let c = self.viewport.center;
        self.set_center(c.offset(dlat, dlng))
    }

    pub fn zoom_by(&mut self, delta: f64) -> bool {
        self.set_zoom(self.viewport.zoom + delta)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        match clamp_zoom(zoom) {
            Some(z) => replace(&mut self.viewport.zoom, z),
            None => false,
        }
    }

    pub fn rotate_by(&mut self, delta: f64) -> bool {
        self.set_heading(self.viewport.heading + delta)
    }

    pub fn set_heading(&mut self, heading: f64) -> bool {
        match wrap_degrees(heading) {
            Some(h) => replace(&mut self.viewport.heading, h),
            None => false,
        }
    }

    pub fn tilt_by(&mut self, delta: f64) -> bool {
        self.set_tilt(self.viewport.tilt + delta)
    }

    pub fn set_tilt(&mut self, tilt: f64) -> bool {
        match clamp_tilt(tilt) {
            Some(t) => replace(&mut self.viewport.tilt, t),
            None => false,
        }
    }

    /// Switch map type. Imagery types keep 3D massing visible by raising
    /// tilt to at least 45° and zoom to at least 20.
    pub fn set_map_type(&mut self, map_type: MapType) -> bool {
        let mut changed = replace(&mut self.viewport.map_type, map_type);
        if map_type.is_imagery() {
            changed |= self.set_tilt(self.viewport.tilt.max(45.0));
            changed |= self.set_zoom(self.viewport.zoom.max(20.0));
        }
        changed
    }

    pub fn set_rendering_mode(&mut self, mode: RenderingMode) -> bool {
        self.options.rendering_mode = mode;
        replace(&mut self.viewport.rendering_mode, mode)
    }

    /// Drop the vector-only map identifier until the next [`reset`](Self::reset).
    /// Returns `true` if one was set.
    pub fn drop_map_id(&mut self) -> bool {
        self.options.map_id.take().is_some()
    }

    /// Flip between flat and 3D: tilt 0 goes to 45° (zoom ≥ 20, road map),
    /// anything else goes flat.
    pub fn toggle_3d(&mut self) -> bool {
        if self.viewport.tilt == 0.0 {
            let mut changed = self.set_tilt(45.0);
            changed |= self.set_map_type(MapType::Road);
            changed |= self.set_zoom(self.viewport.zoom.max(20.0));
            changed
        } else {
            self.set_tilt(0.0)
        }
    }

    /// Return to the canonical overview and invalidate timed sequences. The
    /// configured map id comes back if a fallback dropped it.
    pub fn reset(&mut self) -> bool {
        self.epoch = self.epoch.wrapping_add(1);
        let home = self.config.home;
        let reset_zoom = self.config.reset_zoom;
        let reset_tilt = self.config.reset_tilt;

        let mut changed = self.set_center(home);
        changed |= self.set_zoom(reset_zoom);
        changed |= self.set_tilt(reset_tilt);
        changed |= self.set_heading(0.0);
        changed |= replace(&mut self.viewport.map_type, MapType::Road);
        changed |= self.set_rendering_mode(RenderingMode::Vector);
        self.options.map_id.clone_from(&self.config.map_id);
        debug!(epoch = self.epoch, changed, "viewport reset");
        changed
    }

    /// Fold renderer-reported camera values back in, with the same clamping.
    pub fn observe(&mut self, observed: ObservedCamera) -> bool {
        let mut changed = false;
        if let Some(c) = observed.center {
            changed |= self.set_center(c);
        }
        if let Some(z) = observed.zoom {
            changed |= self.set_zoom(z);
        }
        if let Some(t) = observed.tilt {
            changed |= self.set_tilt(t);
        }
        if let Some(h) = observed.heading {
            changed |= self.set_heading(h);
        }
        changed
    }

    pub fn apply(&mut self, command: &ViewportCommand) -> bool {
        match *command {
            ViewportCommand::SetCenter(c) => self.set_center(c),
            ViewportCommand::PanBy { dlat, dlng } => self.pan_by(dlat, dlng),
            ViewportCommand::ZoomBy(d) => self.zoom_by(d),
            ViewportCommand::SetZoom(z) => self.set_zoom(z),
            ViewportCommand::RotateBy(d) => self.rotate_by(d),
            ViewportCommand::SetHeading(h) => self.set_heading(h),
            ViewportCommand::TiltBy(d) => self.tilt_by(d),
            ViewportCommand::SetTilt(t) => self.set_tilt(t),
            ViewportCommand::Orbit {
                heading_delta,
                tilt_delta,
            } => {
                let rotated = self.rotate_by(heading_delta);
                self.tilt_by(tilt_delta) | rotated
            }
            ViewportCommand::Orient {
                heading,
                tilt,
                zoom,
            } => {
                let mut changed = self.set_heading(heading);
                changed |= self.set_tilt(tilt);
                changed |= self.set_zoom(zoom);
                changed
            }
            ViewportCommand::SetMapType(t) => self.set_map_type(t),
        }
    }
}

fn clamp_zoom(z: f64) -> Option<f64> {
    clamp_finite(z, MIN_ZOOM, MAX_ZOOM)
}

fn clamp_tilt(t: f64) -> Option<f64> {
    clamp_finite(t, MIN_TILT, MAX_TILT)
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::{ObservedCamera, ViewportCommand, ViewportMachine};
    use crate::state::{MAX_TILT, MapType, RenderingMode, ViewportConfig};
    use foundation::geo::LatLng;

    fn machine() -> ViewportMachine {
        ViewportMachine::new(ViewportConfig::default())
    }

    #[test]
    fn zoom_is_clamped_both_ways() {
        let mut m = machine();
        m.zoom_by(100.0);
        assert_eq!(m.viewport().zoom, 22.0);
        m.zoom_by(-100.0);
        assert_eq!(m.viewport().zoom, 3.0);
        assert!(!m.zoom_by(-1.0));
    }

    #[test]
    fn tilt_is_clamped_both_ways() {
        let mut m = machine();
        m.tilt_by(1000.0);
        assert_eq!(m.viewport().tilt, MAX_TILT);
        m.tilt_by(-1000.0);
        assert_eq!(m.viewport().tilt, 0.0);
    }

    #[test]
    fn rotate_eight_eighths_returns_home() {
        let mut m = machine();
        m.set_heading(0.0);
        for _ in 0..8 {
            m.rotate_by(45.0);
        }
        assert_eq!(m.viewport().heading, 0.0);
    }

    #[test]
    fn negative_rotation_wraps() {
        let mut m = machine();
        m.set_heading(0.0);
        m.rotate_by(-15.0);
        assert_eq!(m.viewport().heading, 345.0);
    }

    #[test]
    fn mixed_sequences_keep_invariants() {
        let mut m = machine();
        let deltas = [
            -7.5, 13.0, 400.0, -1234.5, 0.25, 67.5, -0.1, 999.0, -45.0, 22.0, 3.3, -3.3,
        ];
        for (i, d) in deltas.iter().cycle().take(300).enumerate() {
            match i % 3 {
                0 => m.zoom_by(*d),
                1 => m.tilt_by(*d),
                _ => m.rotate_by(*d),
            };
            assert!(m.viewport().satisfies_invariants(), "step {i}: {:?}", m.viewport());
        }
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut m = machine();
        let before = m.viewport().clone();
        assert!(!m.set_zoom(f64::NAN));
        assert!(!m.rotate_by(f64::INFINITY));
        assert!(!m.tilt_by(f64::NEG_INFINITY));
        assert!(!m.set_center(LatLng::new(f64::NAN, 0.0)));
        assert_eq!(*m.viewport(), before);
    }

    #[test]
    fn reset_restores_canonical_state_and_bumps_epoch() {
        let mut m = machine();
        m.set_center(LatLng::new(10.0, 10.0));
        m.set_map_type(MapType::Terrain);
        m.rotate_by(90.0);
        let epoch = m.epoch();

        m.reset();
        let v = m.viewport();
        assert_eq!(v.center, ViewportConfig::default().home);
        assert_eq!(v.zoom, 21.0);
        assert_eq!(v.tilt, 45.0);
        assert_eq!(v.heading, 0.0);
        assert_eq!(v.map_type, MapType::Road);
        assert_eq!(v.rendering_mode, RenderingMode::Vector);
        assert_eq!(m.epoch(), epoch + 1);
    }

    #[test]
    fn imagery_map_types_raise_tilt_and_zoom() {
        let mut m = machine();
        m.set_tilt(10.0);
        m.set_zoom(12.0);
        m.set_map_type(MapType::Satellite);
        assert_eq!(m.viewport().tilt, 45.0);
        assert_eq!(m.viewport().zoom, 20.0);

        m.set_map_type(MapType::Terrain);
        m.set_tilt(5.0);
        assert_eq!(m.viewport().tilt, 5.0);
    }

    #[test]
    fn toggle_3d_flips() {
        let mut m = machine();
        m.set_tilt(0.0);
        m.set_zoom(15.0);
        m.toggle_3d();
        assert_eq!(m.viewport().tilt, 45.0);
        assert_eq!(m.viewport().zoom, 20.0);
        m.toggle_3d();
        assert_eq!(m.viewport().tilt, 0.0);
    }

    #[test]
    fn observed_values_are_clamped() {
        let mut m = machine();
        m.observe(ObservedCamera {
            tilt: Some(90.0),
            heading: Some(-90.0),
            zoom: Some(30.0),
            center: None,
        });
        assert_eq!(m.viewport().tilt, MAX_TILT);
        assert_eq!(m.viewport().heading, 270.0);
        assert_eq!(m.viewport().zoom, 22.0);
    }

    #[test]
    fn orbit_and_orient_commands() {
        let mut m = machine();
        m.apply(&ViewportCommand::Orient {
            heading: 0.0,
            tilt: 45.0,
            zoom: 16.0,
        });
        m.apply(&ViewportCommand::Orbit {
            heading_delta: -30.0,
            tilt_delta: 30.0,
        });
        assert_eq!(m.viewport().heading, 330.0);
        assert_eq!(m.viewport().tilt, MAX_TILT);
        assert_eq!(m.viewport().zoom, 16.0);
    }

    #[test]
    fn drop_map_id_is_one_shot() {
        let mut m = machine();
        assert!(m.options().map_id.is_some());
        assert!(m.drop_map_id());
        assert!(!m.drop_map_id());

        m.reset();
        assert_eq!(m.options().map_id, ViewportConfig::default().map_id);
        assert!(m.drop_map_id());
    }
}
