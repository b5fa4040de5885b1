//! Error types for register access and word encoding

use thiserror::Error;

use crate::bank::BankKind;

/// Errors raised by the codec and the register bank
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// A 32-bit decode was handed the wrong number of words
    #[error("invalid word count: expected {expected}, got {actual}")]
    Format { expected: usize, actual: usize },

    /// Requested span falls outside the bank
    #[error("{bank} address out of range: {address}+{count} exceeds capacity {capacity}")]
    AddressOutOfRange {
        bank: BankKind,
        address: u16,
        count: usize,
        capacity: usize,
    },

    /// Remote peers may not write this bank
    #[error("{0} bank is read-only for remote peers")]
    ReadOnly(BankKind),
}
