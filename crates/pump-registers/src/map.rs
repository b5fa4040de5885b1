//! Station register address map
//!
//! Word offsets are fixed by the station. Each 32-bit field spans two
//! consecutive registers starting at the listed address.

/// Holding register: control mode flag (0 = local, nonzero = external)
pub const CONTROL_HR: u16 = 0;
/// Holding registers 1-2: pump 1 commanded speed (int32)
pub const P1_SPEED_HR: u16 = 1;
/// Holding registers 3-4: pump 2 commanded speed (int32)
pub const P2_SPEED_HR: u16 = 3;

/// Input register: control flag echo (0 = local, 1 = external)
pub const CONTROL_IR: u16 = 0;
pub const P1_SPEED_IR: u16 = 1;
pub const P1_POWER_IR: u16 = 3;
pub const P1_OUTFLOW_IR: u16 = 5;
pub const P2_SPEED_IR: u16 = 7;
pub const P2_POWER_IR: u16 = 9;
pub const P2_OUTFLOW_IR: u16 = 11;

/// First input register of the telemetry block
pub const TELEMETRY_BASE_IR: u16 = CONTROL_IR;
/// Words in the telemetry block: flag plus six 32-bit fields
pub const TELEMETRY_WORDS: usize = 13;

/// Identifies one of the station's two pumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PumpId {
    One,
    Two,
}

impl PumpId {
    /// Both pumps, in register order
    pub const ALL: [PumpId; 2] = [PumpId::One, PumpId::Two];

    /// Zero-based position of the pump
    pub fn index(&self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// The other pump
    pub fn other(&self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Holding register pair carrying this pump's setpoint
    pub fn setpoint_address(&self) -> u16 {
        match self {
            Self::One => P1_SPEED_HR,
            Self::Two => P2_SPEED_HR,
        }
    }

    pub fn speed_address(&self) -> u16 {
        match self {
            Self::One => P1_SPEED_IR,
            Self::Two => P2_SPEED_IR,
        }
    }

    pub fn power_address(&self) -> u16 {
        match self {
            Self::One => P1_POWER_IR,
            Self::Two => P2_POWER_IR,
        }
    }

    pub fn outflow_address(&self) -> u16 {
        match self {
            Self::One => P1_OUTFLOW_IR,
            Self::Two => P2_OUTFLOW_IR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::One => "pump 1",
            Self::Two => "pump 2",
        }
    }
}

impl std::fmt::Display for PumpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
