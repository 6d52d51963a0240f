//! INI-backed configuration file.
//!
//! ```ini
//! [scanner]
//! query_budget = 2200
//! camera_radius_tiles = 70
//!
//! [units]
//! pixel_slack = 50
//! pixel_magnitude_threshold = 5000
//!
//! [projection]
//! screen_tolerance_px = 48
//!
//! [scheduler]
//! poll_interval_ms = 1500
//! fallback_frame_ms = 250
//!
//! [markers]
//! base_size_px = 10
//! level_step_px = 2
//! max_size_px = 28
//! alert_color = #ff3b30e6
//! ```
//!
//! Missing keys keep their defaults. Unknown keys are ignored.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use tracing::debug;

use super::{ConfigError, EngineConfig};
use crate::render::Rgba;

/// Default location: `<config dir>/tilescope/config.ini`.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tilescope").join("config.ini"))
}

/// A configuration file and the values read from it.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    config: EngineConfig,
}

impl ConfigFile {
    /// Defaults bound to `path`, without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: EngineConfig::default(),
        }
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(path)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::new(path));
        }
        let ini = Ini::load_from_file(&path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.clone(),
                source,
            },
            ini::Error::Parse(parse) => ConfigError::Parse {
                path: path.clone(),
                message: parse.to_string(),
            },
        })?;
        let config = from_ini(&ini)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Self { path, config })
    }

    /// Write every key to the file, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        to_ini(&self.config).write_to_file(&self.path).map_err(io_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn into_config(self) -> EngineConfig {
        self.config
    }
}

fn from_ini(ini: &Ini) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();
    for key in ConfigKey::all() {
        if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
            key.set(&mut config, value)?;
        }
    }
    Ok(config)
}

fn to_ini(config: &EngineConfig) -> Ini {
    let mut ini = Ini::new();
    for key in ConfigKey::all() {
        ini.with_section(Some(key.section()))
            .set(key.key_name(), key.get(config));
    }
    ini
}

/// Every key the configuration file understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    QueryBudget,
    CameraRadiusTiles,
    PixelSlack,
    PixelMagnitudeThreshold,
    ScreenTolerancePx,
    PollIntervalMs,
    FallbackFrameMs,
    BaseSizePx,
    LevelStepPx,
    MaxSizePx,
    AlertColor,
}

const ALL_KEYS: [ConfigKey; 11] = [
    ConfigKey::QueryBudget,
    ConfigKey::CameraRadiusTiles,
    ConfigKey::PixelSlack,
    ConfigKey::PixelMagnitudeThreshold,
    ConfigKey::ScreenTolerancePx,
    ConfigKey::PollIntervalMs,
    ConfigKey::FallbackFrameMs,
    ConfigKey::BaseSizePx,
    ConfigKey::LevelStepPx,
    ConfigKey::MaxSizePx,
    ConfigKey::AlertColor,
];

impl ConfigKey {
    /// All keys, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::QueryBudget | ConfigKey::CameraRadiusTiles => "scanner",
            ConfigKey::PixelSlack | ConfigKey::PixelMagnitudeThreshold => "units",
            ConfigKey::ScreenTolerancePx => "projection",
            ConfigKey::PollIntervalMs | ConfigKey::FallbackFrameMs => "scheduler",
            ConfigKey::BaseSizePx
            | ConfigKey::LevelStepPx
            | ConfigKey::MaxSizePx
            | ConfigKey::AlertColor => "markers",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::QueryBudget => "query_budget",
            ConfigKey::CameraRadiusTiles => "camera_radius_tiles",
            ConfigKey::PixelSlack => "pixel_slack",
            ConfigKey::PixelMagnitudeThreshold => "pixel_magnitude_threshold",
            ConfigKey::ScreenTolerancePx => "screen_tolerance_px",
            ConfigKey::PollIntervalMs => "poll_interval_ms",
            ConfigKey::FallbackFrameMs => "fallback_frame_ms",
            ConfigKey::BaseSizePx => "base_size_px",
            ConfigKey::LevelStepPx => "level_step_px",
            ConfigKey::MaxSizePx => "max_size_px",
            ConfigKey::AlertColor => "alert_color",
        }
    }

    /// Dotted name, e.g. `scanner.query_budget`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value formatted for the file.
    pub fn get(&self, config: &EngineConfig) -> String {
        match self {
            ConfigKey::QueryBudget => config.scanner.query_budget.to_string(),
            ConfigKey::CameraRadiusTiles => config.scanner.camera_radius_tiles.to_string(),
            ConfigKey::PixelSlack => config.units.pixel_slack.to_string(),
            ConfigKey::PixelMagnitudeThreshold => config.units.pixel_magnitude_threshold.to_string(),
            ConfigKey::ScreenTolerancePx => config.projection.screen_tolerance_px.to_string(),
            ConfigKey::PollIntervalMs => config.scheduler.poll_interval_ms.to_string(),
            ConfigKey::FallbackFrameMs => config.scheduler.fallback_frame_ms.to_string(),
            ConfigKey::BaseSizePx => config.markers.base_size_px.to_string(),
            ConfigKey::LevelStepPx => config.markers.level_step_px.to_string(),
            ConfigKey::MaxSizePx => config.markers.max_size_px.to_string(),
            ConfigKey::AlertColor => config.markers.alert_color.to_hex(),
        }
    }

    /// Parse and store a value.
    pub fn set(&self, config: &mut EngineConfig, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::QueryBudget => {
                config.scanner.query_budget = value
                    .parse()
                    .map_err(|_| self.invalid(value, "expected a non-negative integer"))?
            }
            ConfigKey::CameraRadiusTiles => {
                config.scanner.camera_radius_tiles = self.positive(value)?
            }
            ConfigKey::PixelSlack => config.units.pixel_slack = self.non_negative(value)?,
            ConfigKey::PixelMagnitudeThreshold => {
                config.units.pixel_magnitude_threshold = self.positive(value)?
            }
            ConfigKey::ScreenTolerancePx => {
                config.projection.screen_tolerance_px = self.non_negative(value)?
            }
            ConfigKey::PollIntervalMs => config.scheduler.poll_interval_ms = self.millis(value)?,
            ConfigKey::FallbackFrameMs => {
                config.scheduler.fallback_frame_ms = self.millis(value)?
            }
            ConfigKey::BaseSizePx => config.markers.base_size_px = self.positive(value)?,
            ConfigKey::LevelStepPx => config.markers.level_step_px = self.non_negative(value)?,
            ConfigKey::MaxSizePx => config.markers.max_size_px = self.positive(value)?,
            ConfigKey::AlertColor => {
                config.markers.alert_color = Rgba::parse_hex(value)
                    .ok_or_else(|| self.invalid(value, "expected #rrggbb or #rrggbbaa"))?
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn non_negative(&self, value: &str) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(self.invalid(value, "expected a finite number >= 0")),
        }
    }

    fn positive(&self, value: &str) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(self.invalid(value, "expected a finite number > 0")),
        }
    }

    fn millis(&self, value: &str) -> Result<u64, ConfigError> {
        match value.parse::<u64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(self.invalid(value, "expected a positive number of milliseconds")),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
