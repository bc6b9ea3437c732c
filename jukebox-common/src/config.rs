//! Configuration loading for the jukebox
//!
//! The whole configuration is one TOML document read at startup. It names
//! the clips for every layer, the victory and one-shot clips, and carries
//! optional `[ramp]`, `[timing]`, `[logging]` and `[clips]` tables. Missing
//! optional values fall back to built-in defaults.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<user config dir>/jukebox/config.toml`

use crate::ramp::{RampInterpolation, RampOverlap, RampProfile, RampStart};
use crate::time::millis_to_duration;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable consulted for the config file path
pub const CONFIG_ENV_VAR: &str = "JUKEBOX_CONFIG";

/// Upper bound on ramp steps; keeps each step slice well above zero
pub const MAX_RAMP_STEPS: u32 = 10_000;

/// Complete jukebox configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JukeboxConfig {
    /// Intro clip per layer, in layer order (index 0 is the lead layer)
    #[serde(default)]
    pub intro_clips: Vec<String>,

    /// Loop clip per layer, same order and length as `intro_clips`
    #[serde(default)]
    pub loop_clips: Vec<String>,

    /// Clip the lead channel switches to on victory
    pub victory_clip: String,

    /// One-shot played when the player is damaged
    pub damaged_sfx: String,

    /// One-shot played on knockout
    pub ko_sfx: String,

    #[serde(default)]
    pub ramp: RampConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Clip catalog for the simulated backend: clip id -> duration in ms
    #[serde(default)]
    pub clips: BTreeMap<String, u64>,
}

/// Volume ramp settings
#[derive(Debug, Clone, Deserialize)]
pub struct RampConfig {
    #[serde(default = "default_ramp_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_ramp_steps")]
    pub steps: u32,

    #[serde(default)]
    pub interpolation: RampInterpolation,

    #[serde(default = "default_true")]
    pub settle_on_target: bool,

    #[serde(default)]
    pub overlap: RampOverlap,

    #[serde(default)]
    pub start: RampStart,
}

/// Which channels `fade_all_speakers` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeAllScope {
    /// Every channel except the lead
    #[default]
    NonLead,

    /// Only channel 1
    FirstNonLead,
}

/// Loop timing and startup settings
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Volume every channel starts at
    #[serde(default = "default_baseline_volume")]
    pub baseline_volume: f32,

    /// Poll period while waiting for the lead channel to stop playing
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    #[serde(default)]
    pub fade_all: FadeAllScope,

    /// Fade the lead layer in as soon as the jukebox starts
    #[serde(default = "default_true")]
    pub add_lead_on_start: bool,

    /// Event bus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_ramp_duration_ms() -> u64 {
    1000
}

fn default_ramp_steps() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

fn default_baseline_volume() -> f32 {
    0.20
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_event_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_ramp_duration_ms(),
            steps: default_ramp_steps(),
            interpolation: RampInterpolation::default(),
            settle_on_target: true,
            overlap: RampOverlap::default(),
            start: RampStart::default(),
        }
    }
}

impl RampConfig {
    /// Ramp timing as used by the scheduler
    pub fn profile(&self) -> RampProfile {
        RampProfile {
            duration: millis_to_duration(self.duration_ms),
            steps: self.steps,
            interpolation: self.interpolation,
            settle_on_target: self.settle_on_target,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            baseline_volume: default_baseline_volume(),
            frame_interval_ms: default_frame_interval_ms(),
            fade_all: FadeAllScope::default(),
            add_lead_on_start: true,
            event_capacity: default_event_capacity(),
        }
    }
}

impl TimingConfig {
    pub fn frame_interval(&self) -> Duration {
        millis_to_duration(self.frame_interval_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl JukeboxConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: JukeboxConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading jukebox configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            "Loaded {} layers, ramp {}ms/{} steps",
            config.layer_count(),
            config.ramp.duration_ms,
            config.ramp.steps
        );
        Ok(config)
    }

    /// Number of layers (channels) this configuration describes
    pub fn layer_count(&self) -> usize {
        self.intro_clips.len()
    }

    /// Simulated-backend clip catalog with durations
    pub fn clip_catalog(&self) -> BTreeMap<String, Duration> {
        self.clips
            .iter()
            .map(|(id, ms)| (id.clone(), millis_to_duration(*ms)))
            .collect()
    }

    /// Check structural constraints that parsing alone cannot express
    pub fn validate(&self) -> Result<()> {
        if self.intro_clips.is_empty() {
            return Err(Error::Config(
                "at least one intro/loop clip pair is required".to_string(),
            ));
        }

        if self.intro_clips.len() != self.loop_clips.len() {
            return Err(Error::Config(format!(
                "intro_clips has {} entries but loop_clips has {}",
                self.intro_clips.len(),
                self.loop_clips.len()
            )));
        }

        if !(0.0..=1.0).contains(&self.timing.baseline_volume) {
            return Err(Error::Config(format!(
                "baseline_volume {} outside 0.0..=1.0",
                self.timing.baseline_volume
            )));
        }

        if self.timing.frame_interval_ms == 0 {
            return Err(Error::Config("frame_interval_ms must be > 0".to_string()));
        }

        if self.ramp.duration_ms == 0 {
            return Err(Error::Config("ramp duration_ms must be > 0".to_string()));
        }

        if self.ramp.steps == 0 || self.ramp.steps > MAX_RAMP_STEPS {
            return Err(Error::Config(format!(
                "ramp steps {} outside 1..={}",
                self.ramp.steps, MAX_RAMP_STEPS
            )));
        }

        Ok(())
    }
}

/// Resolve the configuration file path
///
/// Priority: command-line argument, then `env_var_name`, then the
/// per-user default location.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    let default_path = default_config_path()?;
    if default_path.exists() {
        Ok(default_path)
    } else {
        Err(Error::Config(format!(
            "No config file given and {} does not exist",
            default_path.display()
        )))
    }
}

/// `<user config dir>/jukebox/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("jukebox").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}
