//! Per-pump process model
//!
//! A [`ProcessModel`] tracks one pump's commanded speed and the lag windows
//! behind its outflow and power responses. It advances one sample per call,
//! either wandering on its own ([`ProcessModel::free_run_step`]) or following
//! a caller-supplied speed ([`ProcessModel::driven_step`]).
//!
//! A pump whose commanded speed is zero is cold: its windows are cleared
//! before the next sample so a restart carries no residual state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::history::LagWindow;
use crate::response::{speed_to_outflow, speed_to_power};

/// Efficiency pair for one pump
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpProfile {
    /// Scales the outflow response
    pub outflow_efficiency: f64,
    /// Scales the power response
    pub power_efficiency: f64,
}

impl PumpProfile {
    /// Station pump 1
    pub const PUMP_1: PumpProfile = PumpProfile {
        outflow_efficiency: 0.80,
        power_efficiency: 0.87,
    };

    /// Station pump 2
    pub const PUMP_2: PumpProfile = PumpProfile {
        outflow_efficiency: 0.98,
        power_efficiency: 0.87,
    };
}

impl Default for PumpProfile {
    fn default() -> Self {
        Self::PUMP_1
    }
}

/// Random walk bounds and noise levels shared by every pump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Lowest speed the free-running walk settles to
    pub walk_floor: f64,
    /// Highest speed the free-running walk reaches
    pub walk_ceiling: f64,
    /// Smallest walk step (rpm)
    pub step_min: u32,
    /// Largest walk step (rpm)
    pub step_max: u32,
    /// Lowest cold-start speed (rpm)
    pub start_min: u32,
    /// Highest cold-start speed (rpm)
    pub start_max: u32,
    /// Standard deviation of warm outflow noise
    pub outflow_sigma: f64,
    /// Standard deviation of warm power noise
    pub power_sigma: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            walk_floor: 900.0,
            walk_ceiling: 1500.0,
            step_min: 2,
            step_max: 20,
            start_min: 1000,
            start_max: 1400,
            outflow_sigma: 0.1,
            power_sigma: 0.2,
        }
    }
}

impl ModelConfig {
    /// Reject bounds the model cannot step within
    pub fn validate(&self) -> Result<(), ModelConfigError> {
        for (name, value) in [
            ("walk_floor", self.walk_floor),
            ("walk_ceiling", self.walk_ceiling),
            ("outflow_sigma", self.outflow_sigma),
            ("power_sigma", self.power_sigma),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ModelConfigError::InvalidValue(name));
            }
        }

        check_range("walk", self.walk_floor, self.walk_ceiling)?;
        check_range("step", f64::from(self.step_min), f64::from(self.step_max))?;
        check_range(
            "start",
            f64::from(self.start_min),
            f64::from(self.start_max),
        )
    }
}

fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), ModelConfigError> {
    if min > max {
        Err(ModelConfigError::InvertedRange { name, min, max })
    } else {
        Ok(())
    }
}

/// Errors from [`ModelConfig::validate`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelConfigError {
    /// A lower bound exceeds its upper bound
    #[error("{name} range is inverted: {min} > {max}")]
    InvertedRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// A value is negative, infinite or NaN
    #[error("{0} must be a finite, non-negative number")]
    InvalidValue(&'static str),
}

/// One simulated sample for a pump
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PumpSample {
    /// Speed in rpm
    pub speed: f64,
    /// Power draw
    pub power: f64,
    /// Outflow
    pub outflow: f64,
}

impl PumpSample {
    /// The sample reported by a stopped pump
    pub const STOPPED: PumpSample = PumpSample {
        speed: 0.0,
        power: 0.0,
        outflow: 0.0,
    };
}

/// Stateful simulator for a single pump
#[derive(Debug, Clone)]
pub struct ProcessModel {
    profile: PumpProfile,
    config: ModelConfig,
    commanded_speed: f64,
    speed_history: LagWindow,
    outflow_history: LagWindow,
    power_history: LagWindow,
    rng: StdRng,
}

impl ProcessModel {
    /// Create a cold pump seeded from system entropy
    pub fn new(profile: PumpProfile, config: ModelConfig) -> Self {
        Self::with_rng(profile, config, StdRng::from_entropy())
    }

    /// Create a cold pump with a deterministic seed
    pub fn with_seed(profile: PumpProfile, config: ModelConfig, seed: u64) -> Self {
        Self::with_rng(profile, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(profile: PumpProfile, config: ModelConfig, rng: StdRng) -> Self {
        Self {
            profile,
            config,
            commanded_speed: 0.0,
            speed_history: LagWindow::new(),
            outflow_history: LagWindow::new(),
            power_history: LagWindow::new(),
            rng,
        }
    }

    pub fn profile(&self) -> PumpProfile {
        self.profile
    }

    /// Speed the next sample will run at
    pub fn commanded_speed(&self) -> f64 {
        self.commanded_speed
    }

    pub fn speed_history(&self) -> &LagWindow {
        &self.speed_history
    }

    pub fn outflow_history(&self) -> &LagWindow {
        &self.outflow_history
    }

    pub fn power_history(&self) -> &LagWindow {
        &self.power_history
    }

    /// Whether the pump is stopped with no residual history
    pub fn is_cold(&self) -> bool {
        self.commanded_speed == 0.0
            && self.speed_history.is_empty()
            && self.outflow_history.is_empty()
            && self.power_history.is_empty()
    }

    /// Advance one sample on the pump's own schedule
    ///
    /// A stopped pump restarts at a random speed in the configured start
    /// range. The returned speed is the one the sample ran at; the commanded
    /// speed then takes one bounded random-walk step for the next call.
    pub fn free_run_step(&mut self) -> PumpSample {
        if self.commanded_speed == 0.0 {
            self.clear_history();
            let (low, high) = ordered(self.config.start_min, self.config.start_max);
            let start = self.rng.gen_range(low..=high);
            self.commanded_speed = f64::from(start);
            debug!("Cold start at {} rpm", start);
        }

        let speed = self.commanded_speed;
        let sample = self.advance(speed);
        self.commanded_speed = self.walk(speed);
        sample
    }

    /// Advance one sample at an externally commanded speed
    ///
    /// The caller is responsible for clamping `speed` into range.
    pub fn driven_step(&mut self, speed: f64) -> PumpSample {
        if self.commanded_speed == 0.0 {
            self.clear_history();
        }

        let sample = self.advance(speed);
        self.commanded_speed = speed;
        sample
    }

    /// Stop the pump and discard all history
    pub fn reset(&mut self) {
        self.commanded_speed = 0.0;
        self.clear_history();
    }

    /// Hold the pump stopped for one tick
    pub fn idle(&mut self) -> PumpSample {
        self.reset();
        PumpSample::STOPPED
    }

    fn clear_history(&mut self) {
        self.speed_history.clear();
        self.outflow_history.clear();
        self.power_history.clear();
    }

    fn advance(&mut self, speed: f64) -> PumpSample {
        self.speed_history.push(speed);

        let outflow = speed_to_outflow(
            &self.speed_history,
            &self.outflow_history,
            self.profile.outflow_efficiency,
            self.config.outflow_sigma,
            &mut self.rng,
        );
        let power = speed_to_power(
            &self.speed_history,
            &self.power_history,
            self.profile.power_efficiency,
            self.config.power_sigma,
            &mut self.rng,
        );

        self.outflow_history.push(outflow);
        self.power_history.push(power);

        PumpSample {
            speed,
            power,
            outflow,
        }
    }

    /// One random-walk step from `speed`
    ///
    /// Inverted bounds in an unvalidated config are swapped rather than
    /// allowed to panic.
    fn walk(&mut self, speed: f64) -> f64 {
        let (floor, ceiling) = ordered(self.config.walk_floor, self.config.walk_ceiling);
        let (step_min, step_max) = ordered(self.config.step_min, self.config.step_max);
        let delta = f64::from(self.rng.gen_range(step_min..=step_max));

        let next = if speed <= floor {
            speed + delta
        } else if speed >= ceiling {
            speed - delta
        } else {
            speed + delta * f64::from(self.rng.gen_range(-1i8..=1))
        };
        next.max(floor).min(ceiling)
    }
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(seed: u64) -> ProcessModel {
        ProcessModel::with_seed(PumpProfile::PUMP_1, ModelConfig::default(), seed)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_new_model_is_cold() {
        let pump = model(1);
        assert!(pump.is_cold());
        assert_eq!(pump.commanded_speed(), 0.0);
    }

    #[test]
    fn test_free_run_cold_start_speed_in_range() {
        for seed in 0..50 {
            let mut pump = model(seed);
            let sample = pump.free_run_step();

            assert!((1000.0..=1400.0).contains(&sample.speed));
            assert_eq!(sample.speed.fract(), 0.0);
            assert_close(sample.outflow, 0.80 * 0.35 * sample.speed);
            assert_close(sample.power, 0.87 * 0.00004 * sample.speed.powi(2));
        }
    }

    #[test]
    fn test_free_run_walk_steps_are_bounded() {
        let mut pump = model(42);
        let mut previous = pump.free_run_step().speed;

        for _ in 0..500 {
            let sample = pump.free_run_step();
            let step = (sample.speed - previous).abs();
            assert!(step <= 20.0, "step {step}");
            assert!((900.0..=1500.0).contains(&sample.speed));
            previous = sample.speed;
        }
    }

    #[test]
    fn test_walk_leaves_the_bounds() {
        let mut pump = model(3);
        assert!(pump.walk(900.0) > 900.0);
        assert!(pump.walk(1500.0) < 1500.0);
        assert!(pump.walk(850.0) >= 900.0);
    }

    #[test]
    fn test_free_run_history_fills() {
        let mut pump = model(5);
        for _ in 0..3 {
            pump.free_run_step();
        }
        assert!(!pump.speed_history().has_gap());
        assert!(!pump.outflow_history().has_gap());
        assert!(!pump.power_history().has_gap());
    }

    #[test]
    fn test_driven_step_follows_setpoint() {
        let mut pump = model(9);
        let first = pump.driven_step(1200.0);

        assert_eq!(first.speed, 1200.0);
        assert_close(first.outflow, 0.80 * 0.35 * 1200.0);
        assert_close(first.power, 0.87 * 0.00004 * 1200.0 * 1200.0);
        assert_eq!(pump.commanded_speed(), 1200.0);

        let second = pump.driven_step(1300.0);
        assert_eq!(second.speed, 1300.0);
        assert_close(
            second.outflow,
            0.80 * (0.35 * 1300.0 + 0.085 * first.outflow),
        );
        assert_eq!(pump.speed_history().values(), [0.0, 1200.0, 1300.0]);
    }

    #[test]
    fn test_driven_stop_clears_history_on_next_step() {
        let mut pump = model(11);
        for speed in [1200.0, 1210.0, 1220.0, 1230.0] {
            pump.driven_step(speed);
        }
        pump.driven_step(0.0);
        assert_eq!(pump.commanded_speed(), 0.0);

        let restart = pump.driven_step(1000.0);
        assert_eq!(pump.speed_history().values(), [0.0, 0.0, 1000.0]);
        assert_close(restart.outflow, 0.80 * 0.35 * 1000.0);
    }

    #[test]
    fn test_reset_forces_cold_formulas() {
        let mut pump = model(13);
        for _ in 0..10 {
            pump.free_run_step();
        }
        pump.reset();
        assert!(pump.is_cold());

        let sample = pump.driven_step(1100.0);
        assert_close(sample.outflow, 0.80 * 0.35 * 1100.0);
        assert_close(sample.power, 0.87 * 0.00004 * 1100.0 * 1100.0);

        pump.reset();
        let sample = pump.free_run_step();
        assert_close(sample.outflow, 0.80 * 0.35 * sample.speed);
    }

    #[test]
    fn test_idle_reports_stopped() {
        let mut pump = model(17);
        pump.free_run_step();
        pump.free_run_step();

        assert_eq!(pump.idle(), PumpSample::STOPPED);
        assert!(pump.is_cold());
    }

    #[test]
    fn test_same_seed_same_trace() {
        let mut a = model(21);
        let mut b = model(21);
        for _ in 0..20 {
            assert_eq!(a.free_run_step(), b.free_run_step());
        }
    }

    #[test]
    fn test_model_config_defaults_from_empty_json() {
        let config: ModelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ModelConfig::default());

        let config: ModelConfig = serde_json::from_str(r#"{"walk_floor": 800.0}"#).unwrap();
        assert_eq!(config.walk_floor, 800.0);
        assert_eq!(config.walk_ceiling, 1500.0);
    }

    #[test]
    fn test_model_config_validation() {
        assert_eq!(ModelConfig::default().validate(), Ok(()));

        let config = ModelConfig {
            walk_floor: 1600.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ModelConfigError::InvertedRange {
                name: "walk",
                min: 1600.0,
                max: 1500.0,
            })
        );

        let config = ModelConfig {
            step_min: 30,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ModelConfigError::InvertedRange { name: "step", .. })
        ));

        let config = ModelConfig {
            power_sigma: f64::NAN,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ModelConfigError::InvalidValue("power_sigma"))
        );
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let config = ModelConfig {
            walk_floor: 1600.0,
            start_min: 1500,
            start_max: 1100,
            step_min: 20,
            step_max: 2,
            ..Default::default()
        };
        let mut pump = ProcessModel::with_seed(PumpProfile::PUMP_1, config, 9);

        let first = pump.free_run_step();
        assert!((1100.0..=1500.0).contains(&first.speed));
        for _ in 0..50 {
            let sample = pump.free_run_step();
            assert!((1500.0..=1600.0).contains(&sample.speed));
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn walk_stays_within_bounds(seed: u64, speed in 900u32..=1500u32) {
                let mut pump = model(seed);
                let speed = f64::from(speed);
                let next = pump.walk(speed);
                prop_assert!((900.0..=1500.0).contains(&next));
                prop_assert!((next - speed).abs() <= 20.0);
            }

            #[test]
            fn first_driven_step_is_cold(seed: u64, speed in 0u32..=1500u32) {
                let mut pump = model(seed);
                let speed = f64::from(speed);
                let sample = pump.driven_step(speed);
                prop_assert!((sample.outflow - 0.80 * 0.35 * speed).abs() < 1e-9);
                prop_assert!((sample.power - 0.87 * 0.00004 * speed * speed).abs() < 1e-9);
            }
        }
    }
}
