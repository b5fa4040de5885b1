//! Pump Station Register Library
//!
//! This crate provides the register-level view of the simulated pump
//! station:
//!
//! - **codec**: packing of 32-bit integers and floats into big-endian word pairs
//! - **map**: the station's fixed holding/input register addresses
//! - **bank**: the four fixed-capacity register banks
//! - **frame**: the 13-word telemetry block published every tick
//!
//! The transport that moves these words over the wire is not part of this
//! crate; it only sees `read(bank, address, count)` and
//! `write(bank, address, words)`.
//!
//! # Example
//!
//! ```rust
//! use pump_registers::{map, RegisterBank};
//!
//! let mut bank = RegisterBank::default();
//! bank.set_holding_i32(map::P1_SPEED_HR, 1200).unwrap();
//! assert_eq!(bank.holding_i32(map::P1_SPEED_HR).unwrap(), 1200);
//! ```

pub mod bank;
pub mod codec;
pub mod error;
pub mod frame;
pub mod map;

pub use bank::{BankKind, RegisterBank, DEFAULT_BANK_CAPACITY};
pub use error::RegisterError;
pub use frame::{PumpTelemetry, TelemetryFrame};
pub use map::PumpId;
