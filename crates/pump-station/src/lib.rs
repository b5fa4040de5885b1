//! Pump Station Engine
//!
//! This crate runs a simulated two-pump station behind a Modbus-style
//! register bank, and provides a client that polls and commands it.
//!
//! # Architecture
//!
//! The station decides each tick who drives the pumps:
//!
//! - **Local**: the station runs one pump at a time on a bounded random walk
//!   and alternates duty every `alternation_interval_ticks` local ticks
//! - **External**: a peer has set the control flag; both pumps follow the
//!   setpoints in the holding registers, jittered and clamped to the speed
//!   limits
//!
//! # Actor Architecture
//!
//! The station runs as a single tokio task that owns the register bank and
//! all pump state:
//! - Ticks fire on a fixed interval and rewrite the input bank in one step
//! - Register reads and writes arrive as [`StationCommand`]s, so a reader
//!   never sees a half-written tick
//! - Every tick and transition goes out on a [`StationEvent`] broadcast
//!
//! # Example
//!
//! ```rust,no_run
//! use pump_registers::PumpId;
//! use pump_station::{spawn_station, ClientConfig, LocalTransport, PollingClient, StationConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (station, task) = spawn_station(StationConfig::default())?;
//! let mut events = station.subscribe();
//!
//! let mut client = PollingClient::new(LocalTransport::new(station.clone()), ClientConfig::default());
//! client.toggle_control().await?;
//! client.set_pump_speed(PumpId::Two, 1300).await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! #   break;
//! }
//!
//! station.shutdown().await?;
//! task.await??;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod arbiter;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod state;
pub mod transport;

// Re-export actor types
pub use actor::{
    run_station_actor, spawn_station, spawn_station_with_arbiter, StationCommand, StationHandle,
};

// Re-export engine types
pub use arbiter::ControlArbiter;
pub use state::{ControlMode, StationState, TickReport};

// Re-export client types
pub use client::{PollingClient, StationSnapshot};
pub use transport::{LocalTransport, RegisterTransport};

pub use config::{ClientConfig, SpeedLimits, StationConfig};
pub use error::{ClientError, StationError, TransportError};
pub use events::StationEvent;
