//! Control arbitration
//!
//! The [`ControlArbiter`] runs one read-decide-act-write cycle per tick:
//!
//! 1. Read the control flag from the holding bank.
//! 2. Local (flag 0): run the scheduled pump's free-running model and
//!    hold the other stopped. Returning from external control first resets
//!    both pumps.
//! 3. External (flag nonzero): read both int32 setpoints, add actuator
//!    jitter, clamp into range and drive both models.
//! 4. Encode the flag echo and six telemetry fields into the input bank.

use pump_registers::map::{CONTROL_HR, TELEMETRY_BASE_IR};
use pump_registers::{PumpId, RegisterBank, RegisterError, TelemetryFrame};
use pump_sim::response::gaussian_noise;
use pump_sim::PumpSample;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::config::{SpeedLimits, StationConfig};
use crate::state::{to_telemetry, ControlMode, StationState, TickReport};

/// Tick-driven local/external control state machine
#[derive(Debug, Clone)]
pub struct ControlArbiter {
    state: StationState,
    alternation_interval: u64,
    jitter_sigma: f64,
    limits: SpeedLimits,
    rng: StdRng,
    ticks: u64,
}

impl ControlArbiter {
    /// Create an arbiter with entropy-seeded randomness
    pub fn new(config: &StationConfig) -> Self {
        Self::with_parts(config, StationState::new(config), StdRng::from_entropy())
    }

    /// Create a fully deterministic arbiter
    pub fn with_seed(config: &StationConfig, seed: u64) -> Self {
        Self::with_parts(
            config,
            StationState::with_seed(config, seed),
            StdRng::seed_from_u64(seed.wrapping_add(2)),
        )
    }

    fn with_parts(config: &StationConfig, state: StationState, rng: StdRng) -> Self {
        Self {
            state,
            alternation_interval: config.alternation_interval_ticks,
            jitter_sigma: config.setpoint_jitter_sigma,
            limits: config.speed_limits,
            rng,
            ticks: 0,
        }
    }

    pub fn state(&self) -> &StationState {
        &self.state
    }

    /// Mode applied on the most recent tick
    pub fn mode(&self) -> ControlMode {
        self.state.mode
    }

    /// Ticks completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick against `bank`
    pub fn tick(&mut self, bank: &mut RegisterBank) -> Result<TickReport, RegisterError> {
        let previous_mode = self.state.mode;
        let mode = ControlMode::from_flag(bank.holding_word(CONTROL_HR)?);

        let (samples, active_pump) = match mode {
            ControlMode::Local => {
                let (samples, active) = self.local_step();
                (samples, Some(active))
            }
            ControlMode::External => (self.external_step(bank)?, None),
        };
        self.state.mode = mode;

        let frame = TelemetryFrame {
            in_control: mode == ControlMode::External,
            pumps: [to_telemetry(&samples[0]), to_telemetry(&samples[1])],
        };
        bank.write_input(TELEMETRY_BASE_IR, &frame.encode())?;

        let report = TickReport {
            tick: self.ticks,
            mode,
            previous_mode,
            active_pump,
            samples,
            frame,
        };
        self.ticks += 1;

        debug!(
            "Tick {} ({}): p1 speed={:.0} power={:.2} outflow={:.2}, p2 speed={:.0} power={:.2} outflow={:.2}",
            report.tick,
            mode,
            samples[0].speed,
            samples[0].power,
            samples[0].outflow,
            samples[1].speed,
            samples[1].power,
            samples[1].outflow
        );
        Ok(report)
    }

    fn local_step(&mut self) -> ([PumpSample; 2], PumpId) {
        if self.state.was_in_control {
            info!("External control released, resetting pumps");
            self.state.was_in_control = false;
            self.state.reset_pumps();
        }

        let active = self.state.active_pump(self.alternation_interval);
        if let Some(last) = self.state.last_active.filter(|last| *last != active) {
            info!("Alternating duty from {} to {}", last, active);
        }
        self.state.last_active = Some(active);

        let mut samples = [PumpSample::STOPPED; 2];
        samples[active.index()] = self.state.pump_mut(active).free_run_step();
        samples[active.other().index()] = self.state.pump_mut(active.other()).idle();
        self.state.local_ticks += 1;

        (samples, active)
    }

    fn external_step(&mut self, bank: &RegisterBank) -> Result<[PumpSample; 2], RegisterError> {
        if !self.state.was_in_control {
            info!("External control engaged");
        }

        let mut speeds = [0.0; 2];
        for pump in PumpId::ALL {
            let requested = bank.holding_i32(pump.setpoint_address())?;
            speeds[pump.index()] = self.actuate(requested);
        }

        let mut samples = [PumpSample::STOPPED; 2];
        for pump in PumpId::ALL {
            samples[pump.index()] = self.state.pump_mut(pump).driven_step(speeds[pump.index()]);
        }
        self.state.was_in_control = true;
        Ok(samples)
    }

    /// Speed actually applied for a requested setpoint
    ///
    /// Adds actuator jitter, then clamps into the configured limits.
    fn actuate(&mut self, requested: i32) -> f64 {
        let jittered = f64::from(requested) + gaussian_noise(&mut self.rng, self.jitter_sigma);
        self.limits.clamp(jittered)
    }
}
