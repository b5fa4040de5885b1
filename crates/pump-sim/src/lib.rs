//! Pump Process Simulation Library
//!
//! This crate simulates the pumps behind the station's registers without any
//! physical plant. It includes:
//!
//! - **ProcessModel**: per-pump state with free-running and driven stepping
//! - **response**: the lag-based outflow and power models
//! - **LagWindow**: the fixed three-sample history behind each signal
//! - **TelemetryRecorder**: optional CSV logging of generated samples
//!
//! # Example
//!
//! ```rust
//! use pump_sim::{ModelConfig, ProcessModel, PumpProfile};
//!
//! let mut pump = ProcessModel::with_seed(PumpProfile::PUMP_1, ModelConfig::default(), 7);
//!
//! // A cold pump starts somewhere between 1000 and 1400 rpm
//! let sample = pump.free_run_step();
//! assert!((1000.0..=1400.0).contains(&sample.speed));
//!
//! // Take over and drive it directly
//! pump.reset();
//! let driven = pump.driven_step(1250.0);
//! assert_eq!(driven.speed, 1250.0);
//! ```

pub mod history;
pub mod model;
pub mod recorder;
pub mod response;

pub use history::LagWindow;
pub use model::{ModelConfig, ModelConfigError, ProcessModel, PumpProfile, PumpSample};
pub use recorder::TelemetryRecorder;
