//! Configuration loading and typed config structures for Hivefall.
//!
//! The canonical configuration lives in `hivefall-config.yaml` at the
//! project root. Every section and field has a default, so a partial or
//! empty file is valid.

use std::path::Path;

use hivefall_colony::ColonyConfig;
use serde::Deserialize;

use crate::recovery::RecoveryConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors `hivefall-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Queen, hive and liberation parameters.
    #[serde(default)]
    pub colony: ColonyConfig,

    /// Minimum intervals for the throttled subsystems.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Error-recovery timing and retry limits.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Frame-time thresholds for the territory update throttle.
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run bounds for the headless engine.
    #[serde(default)]
    pub simulation: RunConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable world name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for every random draw.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Target frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Territories created around the origin at startup, as a radius in
    /// territory cells (0 creates only the origin territory).
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: u32,

    /// Generation assigned to the first queen of each territory.
    #[serde(default = "default_initial_generation")]
    pub initial_generation: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            frame_rate: default_frame_rate(),
            spawn_radius: default_spawn_radius(),
            initial_generation: default_initial_generation(),
        }
    }
}

/// Minimum intervals for the throttled subsystems, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Energy housekeeping.
    #[serde(default = "default_energy_interval")]
    pub energy_interval_ms: u64,

    /// Territory parasite-count reconciliation.
    #[serde(default = "default_territory_interval")]
    pub territory_interval_ms: u64,

    /// Liberation history upkeep.
    #[serde(default = "default_liberation_interval")]
    pub liberation_interval_ms: u64,

    /// Progression tracking.
    #[serde(default = "default_progression_interval")]
    pub progression_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            energy_interval_ms: default_energy_interval(),
            territory_interval_ms: default_territory_interval(),
            liberation_interval_ms: default_liberation_interval(),
            progression_interval_ms: default_progression_interval(),
        }
    }
}

/// Frame-time thresholds that slow territory updates down under load.
///
/// A reported frame time at or above `threshold_ms[i]` sets the update
/// interval to `i + 2` frames; below the first threshold every frame
/// updates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerformanceConfig {
    /// Ascending frame-time thresholds in milliseconds.
    #[serde(default = "default_frame_time_thresholds")]
    pub frame_time_thresholds_ms: Vec<f32>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            frame_time_thresholds_ms: default_frame_time_thresholds(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Run bounds for the headless engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Frames to run before stopping.
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,

    /// Whether to pace frames to wall-clock time.
    #[serde(default)]
    pub real_time: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
            real_time: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Hivefall".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_frame_rate() -> u32 {
    60
}

const fn default_spawn_radius() -> u32 {
    1
}

const fn default_initial_generation() -> u32 {
    1
}

const fn default_energy_interval() -> u64 {
    100
}

const fn default_territory_interval() -> u64 {
    500
}

const fn default_liberation_interval() -> u64 {
    1000
}

const fn default_progression_interval() -> u64 {
    2000
}

fn default_frame_time_thresholds() -> Vec<f32> {
    vec![20.0, 33.0, 50.0]
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_max_frames() -> u64 {
    36_000
}
