//! Cascade configuration system
//!
//! This crate provides centralized configuration for the cascade runtime,
//! loading settings from `cascade.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "cascade.toml";

/// Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CascadeConfig {
    /// Scheduler policy
    pub scheduler: SchedulerConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Headless driver settings
    pub demo: DemoConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Drop every registered item and core root when a scene is unloaded
    pub clear_lists_on_scene_unload: bool,
    /// Host is in live execution mode (loops only run while live)
    pub live: bool,
    /// Upper bound on immediate loop re-runs of one item inside one tick
    pub max_catch_up_steps: u32,
    /// Keep at most this many undrained lifecycle events (unbounded when unset)
    pub event_queue_limit: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` style filter, e.g. `cascade_core=debug`
    pub filter: Option<String>,
}

/// Headless driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Scene description to load (TOML)
    pub scene: Option<PathBuf>,
    /// Number of host frames to simulate
    pub frames: u32,
    /// Normal and post phase rate in frames per second
    pub frame_rate: f32,
    /// Fixed phase rate in steps per second
    pub fixed_rate: f32,
    /// Multiplier applied to scaled delta times
    pub time_scale: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            clear_lists_on_scene_unload: false,
            live: true,
            max_catch_up_steps: 8,
            event_queue_limit: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            scene: None,
            frames: 240,
            frame_rate: 60.0,
            fixed_rate: 50.0,
            time_scale: 1.0,
        }
    }
}

impl CascadeConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the cascade.toml configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (cascade.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(scene) = std::env::var("CASCADE_SCENE") {
            self.demo.scene = Some(PathBuf::from(scene));
        }
        if let Ok(val) = std::env::var("CASCADE_FRAMES") {
            if let Ok(frames) = val.parse::<u32>() {
                self.demo.frames = frames;
            }
        }
        if let Ok(val) = std::env::var("CASCADE_FRAME_RATE") {
            if let Ok(rate) = val.parse::<f32>() {
                self.demo.frame_rate = rate;
            }
        }
        if let Ok(val) = std::env::var("CASCADE_TIME_SCALE") {
            if let Ok(scale) = val.parse::<f32>() {
                self.demo.time_scale = scale;
            }
        }

        if let Ok(val) = std::env::var("CASCADE_LIVE") {
            self.scheduler.live = parse_flag(&val);
        }
        if let Ok(val) = std::env::var("CASCADE_CLEAR_ON_UNLOAD") {
            self.scheduler.clear_lists_on_scene_unload = parse_flag(&val);
        }

        if let Ok(filter) = std::env::var("CASCADE_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from cascade.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}
