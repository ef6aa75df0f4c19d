//! TOML configuration loader with validation.
//!
//! All fields carry serde defaults so a partial (or empty) file is a
//! valid configuration; `validate()` enforces the parameter bounds
//! before the planner is built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use omk_common::consts::{
    CYCLE_TIME_US_DEFAULT, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, LOOKAHEAD_DEPTH_DEFAULT,
    LOOKAHEAD_DEPTH_MAX, LOOKAHEAD_DEPTH_MIN, TC_QUEUE_SIZE_DEFAULT, TC_QUEUE_SIZE_MAX,
    TC_QUEUE_SIZE_MIN,
};

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Parameter bounds violation.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Planner Config ─────────────────────────────────────────────────

/// Planner and host-runner configuration, loaded from TOML at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Servo cycle time [µs] (default 1000 = 1 kHz).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Segment queue capacity.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Default axis velocity bound [user units/s].
    #[serde(default = "default_vmax")]
    pub vmax: f64,

    /// Default rapid-velocity cap for new segments [user units/s].
    #[serde(default = "default_ini_maxvel")]
    pub ini_maxvel: f64,

    /// Tool-tip velocity limit [user units/s].
    #[serde(default = "default_vlimit")]
    pub vlimit: f64,

    /// Acceleration bound [user units/s^2].
    #[serde(default = "default_amax")]
    pub amax: f64,

    /// Look-ahead depth for the backward end-velocity pass.
    #[serde(default = "default_lookahead_depth")]
    pub lookahead_depth: usize,

    /// Splice tangent blend arcs between linear moves. Off by default:
    /// corners then blend parabolically.
    #[serde(default)]
    pub enable_blend_arcs: bool,

    /// CPU core the RT cycle is pinned to (`rt` builds).
    #[serde(default = "default_cpu_core")]
    pub cpu_core: usize,

    /// SCHED_FIFO priority (`rt` builds).
    #[serde(default = "default_rt_priority")]
    pub rt_priority: i32,

    /// Host runner status log interval [cycles].
    #[serde(default = "default_status_log_interval")]
    pub status_log_interval: u64,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US_DEFAULT
}
fn default_queue_size() -> usize {
    TC_QUEUE_SIZE_DEFAULT
}
fn default_vmax() -> f64 {
    100.0
}
fn default_ini_maxvel() -> f64 {
    200.0
}
fn default_vlimit() -> f64 {
    1000.0
}
fn default_amax() -> f64 {
    1000.0
}
fn default_lookahead_depth() -> usize {
    LOOKAHEAD_DEPTH_DEFAULT
}
fn default_cpu_core() -> usize {
    1
}
fn default_rt_priority() -> i32 {
    80
}
fn default_status_log_interval() -> u64 {
    1000
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: default_cycle_time_us(),
            queue_size: default_queue_size(),
            vmax: default_vmax(),
            ini_maxvel: default_ini_maxvel(),
            vlimit: default_vlimit(),
            amax: default_amax(),
            lookahead_depth: default_lookahead_depth(),
            enable_blend_arcs: false,
            cpu_core: default_cpu_core(),
            rt_priority: default_rt_priority(),
            status_log_interval: default_status_log_interval(),
        }
    }
}

impl PlannerConfig {
    /// Servo cycle time [s].
    #[inline]
    pub fn cycle_time(&self) -> f64 {
        self.cycle_time_us as f64 * 1e-6
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(ConfigError::Validation(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            )));
        }
        if self.queue_size < TC_QUEUE_SIZE_MIN || self.queue_size > TC_QUEUE_SIZE_MAX {
            return Err(ConfigError::Validation(format!(
                "queue_size {} out of range [{}, {}]",
                self.queue_size, TC_QUEUE_SIZE_MIN, TC_QUEUE_SIZE_MAX
            )));
        }
        if self.lookahead_depth < LOOKAHEAD_DEPTH_MIN || self.lookahead_depth > LOOKAHEAD_DEPTH_MAX
        {
            return Err(ConfigError::Validation(format!(
                "lookahead_depth {} out of range [{}, {}]",
                self.lookahead_depth, LOOKAHEAD_DEPTH_MIN, LOOKAHEAD_DEPTH_MAX
            )));
        }
        for (name, value) in [
            ("vmax", self.vmax),
            ("ini_maxvel", self.ini_maxvel),
            ("vlimit", self.vlimit),
            ("amax", self.amax),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a planner configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PlannerConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    load_config_from_str(&text)
}

/// Load a planner configuration from a TOML string (for testing).
pub fn load_config_from_str(text: &str) -> Result<PlannerConfig, ConfigError> {
    let config: PlannerConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
