//! Station event stream
//!
//! Observers subscribe through [`StationHandle::subscribe`](crate::StationHandle::subscribe)
//! and receive every tick plus notable transitions in tick order.

use pump_registers::{BankKind, PumpId};

use crate::state::{ControlMode, TickReport};

/// Events broadcast by the station actor
#[derive(Debug, Clone)]
pub enum StationEvent {
    /// A tick completed and the input bank was rewritten
    Tick(TickReport),

    /// The control flag switched modes
    ModeChanged {
        /// Mode before this tick
        from: ControlMode,
        /// Mode applied this tick
        to: ControlMode,
    },

    /// Free-run duty moved to another pump
    PumpAlternated {
        /// Pump now running
        active: PumpId,
    },

    /// A remote peer wrote registers
    RegistersWritten {
        bank: BankKind,
        address: u16,
        count: usize,
    },
}
