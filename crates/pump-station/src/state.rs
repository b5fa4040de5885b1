//! Station state tracking

use pump_registers::{PumpId, PumpTelemetry, TelemetryFrame};
use pump_sim::{ProcessModel, PumpSample};
use serde::{Deserialize, Serialize};

use crate::config::StationConfig;

/// Who decides the pumps' speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// The station runs its own simulation
    #[default]
    Local,
    /// The station follows setpoints written by a remote peer
    External,
}

impl ControlMode {
    /// Interpret the control holding register
    pub fn from_flag(flag: u16) -> Self {
        if flag == 0 {
            Self::Local
        } else {
            Self::External
        }
    }

    /// Value echoed in the control input register
    pub fn flag(&self) -> u16 {
        match self {
            Self::Local => 0,
            Self::External => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the station mutates from tick to tick
#[derive(Debug, Clone)]
pub struct StationState {
    /// Process models for pump 1 and pump 2
    pub pumps: [ProcessModel; 2],
    /// Mode applied on the most recent tick
    pub mode: ControlMode,
    /// Set while external setpoints are being followed
    pub was_in_control: bool,
    /// Free-run ticks completed, drives pump alternation
    pub local_ticks: u64,
    /// Pump that ran on the most recent free-run tick
    pub last_active: Option<PumpId>,
}

impl StationState {
    /// Create a state with two cold pumps
    pub fn new(config: &StationConfig) -> Self {
        Self::from_pumps([
            ProcessModel::new(config.pumps[0], config.model.clone()),
            ProcessModel::new(config.pumps[1], config.model.clone()),
        ])
    }

    /// Create a state with deterministic pump seeds
    pub fn with_seed(config: &StationConfig, seed: u64) -> Self {
        Self::from_pumps([
            ProcessModel::with_seed(config.pumps[0], config.model.clone(), seed),
            ProcessModel::with_seed(config.pumps[1], config.model.clone(), seed.wrapping_add(1)),
        ])
    }

    fn from_pumps(pumps: [ProcessModel; 2]) -> Self {
        Self {
            pumps,
            mode: ControlMode::Local,
            was_in_control: false,
            local_ticks: 0,
            last_active: None,
        }
    }

    pub fn pump(&self, pump: PumpId) -> &ProcessModel {
        &self.pumps[pump.index()]
    }

    pub fn pump_mut(&mut self, pump: PumpId) -> &mut ProcessModel {
        &mut self.pumps[pump.index()]
    }

    /// Pump scheduled to run on the next free-run tick
    ///
    /// Pump 1 runs for the first `interval` ticks, then pump 2 for the next
    /// `interval`, and so on.
    pub fn active_pump(&self, interval: u64) -> PumpId {
        if (self.local_ticks / interval.max(1)) % 2 == 0 {
            PumpId::One
        } else {
            PumpId::Two
        }
    }

    /// Stop both pumps and discard their history
    pub fn reset_pumps(&mut self) {
        for pump in &mut self.pumps {
            pump.reset();
        }
        self.last_active = None;
    }
}

/// Outcome of one arbiter tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick index, starting at 0
    pub tick: u64,
    /// Mode applied this tick
    pub mode: ControlMode,
    /// Mode applied on the previous tick
    pub previous_mode: ControlMode,
    /// Pump that ran (free-run only)
    pub active_pump: Option<PumpId>,
    /// Raw samples for pump 1 and pump 2
    pub samples: [PumpSample; 2],
    /// Telemetry as written to the input bank
    pub frame: TelemetryFrame,
}

impl TickReport {
    /// Whether the control mode changed on this tick
    pub fn mode_changed(&self) -> bool {
        self.mode != self.previous_mode
    }
}

/// Convert a simulated sample to its published form
///
/// Speed is truncated toward zero; power and outflow narrow to single
/// precision.
pub fn to_telemetry(sample: &PumpSample) -> PumpTelemetry {
    PumpTelemetry {
        speed: sample.speed as i32,
        power: sample.power as f32,
        outflow: sample.outflow as f32,
    }
}
