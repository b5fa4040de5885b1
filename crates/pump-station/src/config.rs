//! Station and client configuration
//!
//! Defaults match the reference deployment. Both structs deserialize from
//! partial JSON, filling unspecified fields from their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pump_registers::map::TELEMETRY_WORDS;
use pump_registers::DEFAULT_BANK_CAPACITY;
use pump_sim::{ModelConfig, PumpProfile};
use serde::{Deserialize, Serialize};

use crate::error::StationError;

/// Allowed range for applied pump speeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimits {
    pub min: f64,
    pub max: f64,
}

impl SpeedLimits {
    /// Clamp a speed into range
    pub fn clamp(&self, speed: f64) -> f64 {
        speed.clamp(self.min, self.max)
    }
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1500.0,
        }
    }
}

/// Station configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Tick period (ms)
    pub tick_interval_ms: u64,
    /// Free-run ticks between pump alternations
    pub alternation_interval_ticks: u64,
    /// Words per register bank
    pub bank_capacity: usize,
    /// Standard deviation of jitter added to external setpoints
    pub setpoint_jitter_sigma: f64,
    /// Clamp range for external setpoints
    pub speed_limits: SpeedLimits,
    /// Efficiency profiles for pump 1 and pump 2
    pub pumps: [PumpProfile; 2],
    /// Process model tuning shared by both pumps
    pub model: ModelConfig,
    /// CSV file receiving one row per tick
    pub telemetry_log: Option<PathBuf>,
    /// Station inbox capacity
    pub command_buffer: usize,
    /// Event broadcast capacity
    pub event_buffer: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            alternation_interval_ticks: 240,
            bank_capacity: DEFAULT_BANK_CAPACITY,
            setpoint_jitter_sigma: 0.1,
            speed_limits: SpeedLimits::default(),
            pumps: [PumpProfile::PUMP_1, PumpProfile::PUMP_2],
            model: ModelConfig::default(),
            telemetry_log: None,
            command_buffer: 64,
            event_buffer: 256,
        }
    }
}

impl StationConfig {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, StationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StationError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Reject configurations the station cannot run with
    pub fn validate(&self) -> Result<(), StationError> {
        if self.tick_interval_ms == 0 {
            return Err(StationError::InvalidConfig(
                "tick_interval_ms must be nonzero".into(),
            ));
        }
        if self.alternation_interval_ticks == 0 {
            return Err(StationError::InvalidConfig(
                "alternation_interval_ticks must be nonzero".into(),
            ));
        }
        if self.bank_capacity < TELEMETRY_WORDS {
            return Err(StationError::InvalidConfig(format!(
                "bank_capacity {} cannot hold the {}-word telemetry block",
                self.bank_capacity, TELEMETRY_WORDS
            )));
        }
        if self.speed_limits.min > self.speed_limits.max {
            return Err(StationError::InvalidConfig(
                "speed_limits.min exceeds speed_limits.max".into(),
            ));
        }
        self.model.validate()?;
        if self.command_buffer == 0 || self.event_buffer == 0 {
            return Err(StationError::InvalidConfig(
                "channel buffers must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// Polling client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Delay between poll cycles (ms)
    pub poll_interval_ms: u64,
    /// Attempts per request before giving up
    pub max_attempts: u32,
    /// Delay before the first retry (ms)
    pub initial_backoff_ms: u64,
    /// Upper bound on the retry delay (ms)
    pub max_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
