//! Engine configuration.
//!
//! Tunables live in [`EngineConfig`], grouped by the component that reads
//! them. They are loaded from an INI file by [`ConfigFile`] and default to
//! the `DEFAULT_*` constants of each component.
//!
//! [`EngineSettings`] is separate: it is owned by the host's settings store,
//! delivered as JSON on every change, and read-only to the engine.

mod file;

pub use file::{config_file_path, ConfigFile, ConfigKey};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{MagnitudeHeuristic, DEFAULT_PIXEL_MAGNITUDE_THRESHOLD, DEFAULT_PIXEL_SLACK};
use crate::projector::DEFAULT_SCREEN_TOLERANCE_PX;
use crate::render::{
    MarkerStyle, Rgba, ALERT_COLOR, DEFAULT_BASE_SIZE_PX, DEFAULT_LEVEL_STEP_PX,
    DEFAULT_MAX_SIZE_PX,
};
use crate::scanner::DEFAULT_QUERY_BUDGET;
use crate::viewport::DEFAULT_CAMERA_RADIUS_TILES;

/// Default interval between budgeted scan cycles, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Default time without a cycle after which the event-driven scheduler
/// runs one anyway, in milliseconds.
pub const DEFAULT_FALLBACK_FRAME_MS: u64 = 250;

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Invalid engine settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Ring scanner and bounds tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Maximum geometry point-queries per cycle.
    pub query_budget: u32,
    /// Half-width of the camera fallback window, in tiles.
    pub camera_radius_tiles: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            query_budget: DEFAULT_QUERY_BUDGET,
            camera_radius_tiles: DEFAULT_CAMERA_RADIUS_TILES,
        }
    }
}

/// Unit classification tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitsConfig {
    pub pixel_slack: f64,
    pub pixel_magnitude_threshold: f64,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            pixel_slack: DEFAULT_PIXEL_SLACK,
            pixel_magnitude_threshold: DEFAULT_PIXEL_MAGNITUDE_THRESHOLD,
        }
    }
}

impl UnitsConfig {
    /// Build the classifier these settings describe.
    pub fn classifier(&self) -> MagnitudeHeuristic {
        MagnitudeHeuristic::new(self.pixel_slack, self.pixel_magnitude_threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionConfig {
    pub screen_tolerance_px: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            screen_tolerance_px: DEFAULT_SCREEN_TOLERANCE_PX,
        }
    }
}

/// Scheduler cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    pub fallback_frame_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            fallback_frame_ms: DEFAULT_FALLBACK_FRAME_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fallback_frame(&self) -> Duration {
        Duration::from_millis(self.fallback_frame_ms)
    }
}

/// Marker sizing and alert color.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkersConfig {
    pub base_size_px: f64,
    pub level_step_px: f64,
    pub max_size_px: f64,
    pub alert_color: Rgba,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            base_size_px: DEFAULT_BASE_SIZE_PX,
            level_step_px: DEFAULT_LEVEL_STEP_PX,
            max_size_px: DEFAULT_MAX_SIZE_PX,
            alert_color: ALERT_COLOR,
        }
    }
}

impl MarkersConfig {
    /// Build a marker style with the default type palette.
    pub fn style(&self) -> MarkerStyle {
        MarkerStyle {
            base_size: self.base_size_px,
            level_step: self.level_step_px,
            max_size: self.max_size_px,
            alert_color: self.alert_color,
            ..MarkerStyle::default()
        }
    }
}

/// All engine tunables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub scanner: ScannerConfig,
    pub units: UnitsConfig,
    pub projection: ProjectionConfig,
    pub scheduler: SchedulerConfig,
    pub markers: MarkersConfig,
}

/// Feature settings from the host's settings store.
///
/// The budgeted engine runs only while `enabled` is set and
/// `score_threshold` is strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub enabled: bool,
    #[serde(alias = "scoreThreshold")]
    pub score_threshold: f64,
}

impl EngineSettings {
    pub fn new(enabled: bool, score_threshold: f64) -> Self {
        Self {
            enabled,
            score_threshold,
        }
    }

    /// Parse settings delivered by the host as JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the budgeted engine should be scanning.
    pub fn allows_scanning(&self) -> bool {
        self.enabled && self.score_threshold > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.scanner.query_budget, 2200);
        assert_eq!(config.scanner.camera_radius_tiles, 70.0);
        assert_eq!(config.units.pixel_slack, 50.0);
        assert_eq!(config.units.pixel_magnitude_threshold, 5000.0);
        assert_eq!(config.projection.screen_tolerance_px, 48.0);
        assert_eq!(config.scheduler.poll_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn test_settings_from_camel_case_json() {
        let settings = EngineSettings::from_json(r#"{"enabled":true,"scoreThreshold":250}"#).unwrap();
        assert_eq!(settings, EngineSettings::new(true, 250.0));
        assert!(settings.allows_scanning());
    }

    #[test]
    fn test_settings_missing_fields_default() {
        let settings = EngineSettings::from_json(r#"{"enabled":true}"#).unwrap();
        assert_eq!(settings.score_threshold, 0.0);
        assert!(!settings.allows_scanning());
    }

    #[test]
    fn test_settings_invalid_json() {
        let result = EngineSettings::from_json("{not json");
        assert!(matches!(result, Err(ConfigError::Settings(_))));
    }

    #[test]
    fn test_disabled_never_scans() {
        assert!(!EngineSettings::new(false, 500.0).allows_scanning());
        assert!(!EngineSettings::new(true, -1.0).allows_scanning());
    }

    #[test]
    fn test_markers_config_builds_style() {
        let markers = MarkersConfig {
            max_size_px: 12.0,
            ..MarkersConfig::default()
        };
        let style = markers.style();
        assert_eq!(style.max_size, 12.0);
        assert_eq!(style.size_for(Some(10.0)), 12.0);
    }
}
