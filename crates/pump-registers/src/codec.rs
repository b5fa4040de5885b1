//! 32-bit value packing into pairs of 16-bit registers
//!
//! Every 32-bit value occupies two consecutive registers, high word first.
//! Integers travel as their two's-complement bit pattern and floats as their
//! IEEE-754 single-precision bit pattern, so NaN payloads and infinities
//! survive a round trip untouched.
//!
//! # Example
//!
//! ```rust
//! use pump_registers::codec::{decode_f32, encode_f32};
//!
//! let words = encode_f32(42.5);
//! assert_eq!(words, [0x422A, 0x0000]);
//! assert_eq!(decode_f32(&words).unwrap(), 42.5);
//! ```

use crate::error::RegisterError;

/// Number of registers a 32-bit value occupies
pub const WORDS_PER_VALUE: usize = 2;

/// Split a signed integer into `[high, low]` words
pub fn encode_i32(value: i32) -> [u16; 2] {
    encode_u32(value as u32)
}

/// Split an unsigned integer into `[high, low]` words
pub fn encode_u32(value: u32) -> [u16; 2] {
    [(value >> 16) as u16, (value & 0xFFFF) as u16]
}

/// Split a float's bit pattern into `[high, low]` words
pub fn encode_f32(value: f32) -> [u16; 2] {
    encode_u32(value.to_bits())
}

/// Join two words into an unsigned integer
pub fn decode_u32(words: &[u16]) -> Result<u32, RegisterError> {
    let [high, low] = pair(words)?;
    Ok((u32::from(high) << 16) | u32::from(low))
}

/// Join two words into a signed integer
pub fn decode_i32(words: &[u16]) -> Result<i32, RegisterError> {
    decode_u32(words).map(|raw| raw as i32)
}

/// Join two words into a float
pub fn decode_f32(words: &[u16]) -> Result<f32, RegisterError> {
    decode_u32(words).map(f32::from_bits)
}

fn pair(words: &[u16]) -> Result<[u16; 2], RegisterError> {
    <[u16; 2]>::try_from(words).map_err(|_| RegisterError::Format {
        expected: WORDS_PER_VALUE,
        actual: words.len(),
    })
}
