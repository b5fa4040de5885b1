//! Telemetry block layout
//!
//! The station publishes one 13-word block per tick at the start of the input
//! bank. Clients read the whole block in a single request so the flag and all
//! six fields come from the same tick.

use crate::codec::{decode_f32, decode_i32, encode_f32, encode_i32};
use crate::error::RegisterError;
use crate::map::{PumpId, CONTROL_IR, TELEMETRY_BASE_IR, TELEMETRY_WORDS};

/// Published values for one pump
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PumpTelemetry {
    /// Speed in rpm, truncated toward zero
    pub speed: i32,
    /// Power draw
    pub power: f32,
    /// Outflow
    pub outflow: f32,
}

/// Decoded telemetry block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    /// Whether the station is obeying external setpoints
    pub in_control: bool,
    /// Per-pump values, indexed by [`PumpId::index`]
    pub pumps: [PumpTelemetry; 2],
}

impl TelemetryFrame {
    /// Telemetry for one pump
    pub fn pump(&self, pump: PumpId) -> &PumpTelemetry {
        &self.pumps[pump.index()]
    }

    /// Encode into the input-bank word layout
    pub fn encode(&self) -> [u16; TELEMETRY_WORDS] {
        let mut words = [0u16; TELEMETRY_WORDS];
        words[offset(CONTROL_IR)] = u16::from(self.in_control);
        for pump in PumpId::ALL {
            let values = self.pump(pump);
            put(&mut words, pump.speed_address(), encode_i32(values.speed));
            put(&mut words, pump.power_address(), encode_f32(values.power));
            put(
                &mut words,
                pump.outflow_address(),
                encode_f32(values.outflow),
            );
        }
        words
    }

    /// Decode a block read from the input bank
    pub fn decode(words: &[u16]) -> Result<Self, RegisterError> {
        if words.len() != TELEMETRY_WORDS {
            return Err(RegisterError::Format {
                expected: TELEMETRY_WORDS,
                actual: words.len(),
            });
        }

        let mut frame = TelemetryFrame {
            in_control: words[offset(CONTROL_IR)] != 0,
            ..Default::default()
        };
        for pump in PumpId::ALL {
            frame.pumps[pump.index()] = PumpTelemetry {
                speed: decode_i32(field(words, pump.speed_address()))?,
                power: decode_f32(field(words, pump.power_address()))?,
                outflow: decode_f32(field(words, pump.outflow_address()))?,
            };
        }
        Ok(frame)
    }
}

fn offset(address: u16) -> usize {
    usize::from(address - TELEMETRY_BASE_IR)
}

fn put(words: &mut [u16], address: u16, pair: [u16; 2]) {
    let start = offset(address);
    words[start..start + 2].copy_from_slice(&pair);
}

fn field(words: &[u16], address: u16) -> &[u16] {
    let start = offset(address);
    &words[start..start + 2]
}
