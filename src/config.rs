//! # Control Panel Configuration
//!
//! This module defines the configuration for the actuator API connection, the motion
//! convergence tracker, and the simulated actuator.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api"
//! token = "0123456789abcdef"
//!
//! [motion]
//! arrival_threshold = 0.5
//!
//! [motion.home]
//! initial_delay_ms = 2000
//! poll_interval_ms = 1000
//! max_attempts = 20
//!
//! [sim]
//! bind = "127.0.0.1:8000"
//! speed = 200.0
//! ```
//!
//! - Every poll profile (`absolute`, `relative`, `nudge`, `home`) can be tuned independently.
//! - The arrival threshold is shared by all motion kinds.
//! - `FARM_PILOT_TOKEN` in the environment overrides `api.token`.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::motion::MotionKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the API client, motion tracking and the simulator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Remote actuator API connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Poll schedule for one motion kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollProfile {
    pub initial_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl PollProfile {
    pub const fn new(initial_delay_ms: u64, poll_interval_ms: u64, max_attempts: u32) -> Self {
        Self { initial_delay_ms, poll_interval_ms, max_attempts }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Convergence tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f64,
    #[serde(default = "default_speed")]
    pub default_speed: u8,
    #[serde(default = "default_move_profile")]
    pub absolute: PollProfile,
    #[serde(default = "default_move_profile")]
    pub relative: PollProfile,
    #[serde(default = "default_nudge_profile")]
    pub nudge: PollProfile,
    #[serde(default = "default_home_profile")]
    pub home: PollProfile,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: default_arrival_threshold(),
            default_speed: default_speed(),
            absolute: default_move_profile(),
            relative: default_move_profile(),
            nudge: default_nudge_profile(),
            home: default_home_profile(),
        }
    }
}

impl MotionConfig {
    pub fn profile(&self, kind: MotionKind) -> PollProfile {
        match kind {
            MotionKind::Absolute => self.absolute,
            MotionKind::Relative => self.relative,
            MotionKind::Nudge => self.nudge,
            MotionKind::Home => self.home,
        }
    }

    /// Validate thresholds, attempt limits and the default speed.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.arrival_threshold > 0.0) {
            return Err("arrival_threshold must be > 0".to_string());
        }
        if !(1..=100).contains(&self.default_speed) {
            return Err("default_speed must be between 1 and 100".to_string());
        }
        for kind in MotionKind::ALL {
            if self.profile(kind).max_attempts == 0 {
                return Err(format!("max_attempts for {} moves must be > 0", kind));
            }
        }
        Ok(())
    }
}

/// Simulated actuator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Travel speed in workspace units per second at 100% speed.
    #[serde(default = "default_sim_speed")]
    pub speed: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            speed: default_sim_speed(),
            tick_ms: default_tick_ms(),
            token: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motion.validate().map_err(ConfigError::Invalid)?;
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url cannot be empty".to_string()));
        }
        if !(self.sim.speed > 0.0) || self.sim.tick_ms == 0 {
            return Err(ConfigError::Invalid("sim.speed and sim.tick_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides (`FARM_PILOT_TOKEN`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("FARM_PILOT_TOKEN") {
            if !token.is_empty() {
                self.api.token = Some(token);
            }
        }
        self
    }
}

// Default value functions
fn default_base_url() -> String { "http://localhost:8000/api".to_string() }
fn default_timeout_ms() -> u64 { 5000 }
fn default_arrival_threshold() -> f64 { 0.5 }
fn default_speed() -> u8 { 100 }
fn default_move_profile() -> PollProfile { PollProfile::new(2000, 1000, 10) }
fn default_nudge_profile() -> PollProfile { PollProfile::new(500, 1000, 8) }
fn default_home_profile() -> PollProfile { PollProfile::new(2000, 1000, 20) }
fn default_bind() -> String { "127.0.0.1:8000".to_string() }
fn default_sim_speed() -> f64 { 200.0 }
fn default_tick_ms() -> u64 { 50 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.validate()?;
    Ok(config)
}
