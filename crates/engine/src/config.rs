use std::path::{Path, PathBuf};

use runtime::DEFAULT_LOG_CAPACITY;
use scene::history::DEFAULT_HISTORY_CAPACITY;
use scene::picking::DEFAULT_PROXIMITY_DEG;
use scene::procgen::WindowLayout;
use serde::{Deserialize, Serialize};
use viewport::{
    HighDetailConfig, InputConfig, MAX_TILT, MAX_ZOOM, MIN_TILT, MIN_ZOOM, ViewportConfig,
};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "invalid engine config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

/// Engine configuration. Every field has a default, so `{}` is a valid
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
    pub input: InputConfig,
    pub high_detail: HighDetailConfig,
    /// Synthetic window layout used when no feature data exists.
    pub layout: WindowLayout,
    /// Click-to-building radius in coordinate degrees.
    pub proximity_deg: f64,
    pub history_capacity: usize,
    /// Camera applied when a building gets selected.
    pub selection_zoom: f64,
    pub selection_tilt: f64,
    /// Turn the feature layer on whenever a building gets selected.
    pub show_features_on_select: bool,
    /// Ask the data collaborator for feature detection before falling back
    /// to synthetic windows.
    pub request_detection: bool,
    /// Most recent events kept for [`crate::Engine::events`]; zero keeps
    /// none. Subscribers are notified regardless.
    pub event_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            input: InputConfig::default(),
            high_detail: HighDetailConfig::default(),
            layout: WindowLayout::default(),
            proximity_deg: DEFAULT_PROXIMITY_DEG,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            selection_zoom: 20.0,
            selection_tilt: 45.0,
            show_features_on_select: true,
            request_detection: true,
            event_log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Normalize values the engine cannot use as given. Never fails.
    pub fn validated(mut self) -> Self {
        let d = Self::default();
        if !self.proximity_deg.is_finite() || self.proximity_deg < 0.0 {
            self.proximity_deg = d.proximity_deg;
        }
        self.selection_zoom =
            finite_clamp(self.selection_zoom, MIN_ZOOM, MAX_ZOOM, d.selection_zoom);
        self.selection_tilt =
            finite_clamp(self.selection_tilt, MIN_TILT, MAX_TILT, d.selection_tilt);
        if !self.viewport.home.is_finite() {
            self.viewport.home = d.viewport.home;
        }
        self.layout = self.layout.validated();
        self
    }
}

fn finite_clamp(v: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if v.is_finite() { v.clamp(min, max) } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "proximity_deg": 0.002, "layout": { "windows_per_floor": 12 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.proximity_deg, 0.002);
        assert_eq!(cfg.layout.windows_per_floor, 12);
        assert_eq!(cfg.layout.floors, 17);
        assert_eq!(cfg.history_capacity, 10);
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid engine config"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn validated_clamps_selection_camera() {
        let cfg = EngineConfig {
            selection_zoom: 40.0,
            selection_tilt: -5.0,
            proximity_deg: -1.0,
            ..EngineConfig::default()
        }
        .validated();
        assert_eq!(cfg.selection_zoom, 22.0);
        assert_eq!(cfg.selection_tilt, 0.0);
        assert_eq!(cfg.proximity_deg, 0.001);
    }
}
