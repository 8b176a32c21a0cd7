use foundation::geo::{LatLng, degrees_per_pixel};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::machine::ViewportCommand;
use crate::state::Viewport;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Control,
    Shift,
    Char(char),
    Other,
}

impl Key {
    /// Parse a DOM-style key name (`"ArrowUp"`, `"Escape"`, `"r"`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Escape" => Key::Escape,
            "Control" => Key::Control,
            "Shift" => Key::Shift,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn pressed(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            state: KeyState::Pressed,
        }
    }

    pub fn released(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            state: KeyState::Released,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Raw pointer input. Positions are screen pixels; the click coordinate is
/// supplied already unprojected by the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        pos: [f64; 2],
        button: PointerButton,
    },
    Move {
        pos: [f64; 2],
    },
    Up,
    Click {
        at: LatLng,
    },
}

/// Outcome of routing one raw event.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Viewport(ViewportCommand),
    /// Unresolved click on the map surface.
    Click(LatLng),
    /// Leave the immersive ground-level view if one is open.
    ExitImmersive,
    /// The enhanced-rotation UI flag changed.
    EnhancedRotation(bool),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub zoom_step: f64,
    pub rotate_step: f64,
    pub tilt_step: f64,
    /// Orientation applied by the `r` shortcut.
    pub key_reset_heading: f64,
    pub key_reset_tilt: f64,
    pub key_reset_zoom: f64,
    /// Degrees of heading/tilt per dragged pixel in orbit mode.
    pub orbit_degrees_per_px: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            zoom_step: 1.0,
            rotate_step: 15.0,
            tilt_step: 15.0,
            key_reset_heading: 0.0,
            key_reset_tilt: 45.0,
            key_reset_zoom: 16.0,
            orbit_degrees_per_px: 0.25,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Drag {
    last: [f64; 2],
    orbit: bool,
}

/// Translates raw keyboard and pointer input into viewport commands and intents.
///
/// The router only tracks what it needs to interpret the next event (held
/// modifier, drag in progress); it never touches the viewport itself.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    config: InputConfig,
    enhanced_rotation: bool,
    drag: Option<Drag>,
}

impl InputRouter {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            enhanced_rotation: false,
            drag: None,
        }
    }

    pub fn enhanced_rotation(&self) -> bool {
        self.enhanced_rotation
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn route_key(&mut self, event: KeyEvent) -> Routed {
        let routed = match event.state {
            KeyState::Pressed => self.key_pressed(event),
            KeyState::Released => self.key_released(event),
        };
        trace!(?event, ?routed, "key routed");
        routed
    }

    fn key_pressed(&mut self, event: KeyEvent) -> Routed {
        let cfg = &self.config;
        let shift = event.modifiers.shift;
        match event.key {
            Key::ArrowUp if shift => Routed::Viewport(ViewportCommand::TiltBy(cfg.tilt_step)),
            Key::ArrowDown if shift => Routed::Viewport(ViewportCommand::TiltBy(-cfg.tilt_step)),
            Key::ArrowUp => Routed::Viewport(ViewportCommand::ZoomBy(cfg.zoom_step)),
            Key::ArrowDown => Routed::Viewport(ViewportCommand::ZoomBy(-cfg.zoom_step)),
            Key::ArrowLeft if shift => {
                Routed::Viewport(ViewportCommand::RotateBy(-cfg.rotate_step))
            }
            Key::ArrowRight if shift => {
                Routed::Viewport(ViewportCommand::RotateBy(cfg.rotate_step))
            }
            Key::Char('r') | Key::Char('R') => Routed::Viewport(ViewportCommand::Orient {
                heading: cfg.key_reset_heading,
                tilt: cfg.key_reset_tilt,
                zoom: cfg.key_reset_zoom,
            }),
            Key::Escape => Routed::ExitImmersive,
            Key::Control => self.set_enhanced(true),
            _ => Routed::Ignored,
        }
    }

    fn key_released(&mut self, event: KeyEvent) -> Routed {
        match event.key {
            Key::Control => self.set_enhanced(false),
            _ => Routed::Ignored,
        }
    }

    fn set_enhanced(&mut self, on: bool) -> Routed {
        if self.enhanced_rotation == on {
            return Routed::Ignored;
        }
        self.enhanced_rotation = on;
        Routed::EnhancedRotation(on)
    }

    /// Route a pointer event. `viewport` is needed to convert pixel deltas
    /// into degrees at the current zoom, heading and latitude.
    pub fn route_pointer(&mut self, event: PointerEvent, viewport: &Viewport) -> Routed {
        match event {
            PointerEvent::Click { at } => Routed::Click(at),
            PointerEvent::Down { pos, button } => {
                let orbit = self.enhanced_rotation || button == PointerButton::Secondary;
                self.drag = Some(Drag { last: pos, orbit });
                Routed::Ignored
            }
            PointerEvent::Up => {
                self.drag = None;
                Routed::Ignored
            }
            PointerEvent::Move { pos } => {
                let Some(drag) = self.drag.as_mut() else {
                    return Routed::Ignored;
                };
                let dx = pos[0] - drag.last[0];
                let dy = pos[1] - drag.last[1];
                drag.last = pos;
                if dx == 0.0 && dy == 0.0 {
                    return Routed::Ignored;
                }
                if drag.orbit {
                    let k = self.config.orbit_degrees_per_px;
                    Routed::Viewport(ViewportCommand::Orbit {
                        heading_delta: dx * k,
                        tilt_delta: -dy * k,
                    })
                } else {
                    let (dlat, dlng) = pan_delta(dx, dy, viewport);
                    Routed::Viewport(ViewportCommand::PanBy { dlat, dlng })
                }
            }
        }
    }
}

/// Center shift for a drag of `(dx, dy)` pixels, content following the pointer.
///
/// Screen axes are rotated by the heading; tilt foreshortening is ignored.
fn pan_delta(dx: f64, dy: f64, viewport: &Viewport) -> (f64, f64) {
    let dpp = degrees_per_pixel(viewport.zoom);
    let h = viewport.heading.to_radians();
    let east_px = -dx * h.cos() + dy * h.sin();
    let north_px = dx * h.sin() + dy * h.cos();
    let dlng = east_px * dpp;
    let dlat = north_px * dpp * viewport.center.lat.to_radians().cos();
    (dlat, dlng)
}
