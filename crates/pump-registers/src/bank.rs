//! Register bank storage
//!
//! Four independent word arrays sized once at construction. The bank has no
//! internal locking; the station actor owns it and serializes every access.

use std::fmt;

use crate::codec::{decode_i32, encode_i32};
use crate::error::RegisterError;

/// Default capacity of each bank, in words
pub const DEFAULT_BANK_CAPACITY: usize = 100;

/// Identifies one of the four register banks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BankKind {
    /// Read-only single-bit inputs
    DiscreteInputs,
    /// Read/write single-bit outputs
    Coils,
    /// Read/write words, inbound commands from a remote peer
    Holding,
    /// Read-only words, outbound telemetry from the station
    Input,
}

impl BankKind {
    /// Returns a human-readable name for the bank
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiscreteInputs => "discrete-input",
            Self::Coils => "coil",
            Self::Holding => "holding",
            Self::Input => "input",
        }
    }

    /// Whether a remote peer is allowed to write this bank
    pub fn is_peer_writable(&self) -> bool {
        matches!(self, Self::Coils | Self::Holding)
    }
}

impl fmt::Display for BankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The station's four register banks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    discrete_inputs: Vec<u16>,
    coils: Vec<u16>,
    holding: Vec<u16>,
    input: Vec<u16>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new(DEFAULT_BANK_CAPACITY)
    }
}

impl RegisterBank {
    /// Create a bank with every array zeroed to `capacity` words
    pub fn new(capacity: usize) -> Self {
        Self {
            discrete_inputs: vec![0; capacity],
            coils: vec![0; capacity],
            holding: vec![0; capacity],
            input: vec![0; capacity],
        }
    }

    /// Capacity of each bank in words
    pub fn capacity(&self) -> usize {
        self.holding.len()
    }

    fn words(&self, bank: BankKind) -> &[u16] {
        match bank {
            BankKind::DiscreteInputs => &self.discrete_inputs,
            BankKind::Coils => &self.coils,
            BankKind::Holding => &self.holding,
            BankKind::Input => &self.input,
        }
    }

    fn words_mut(&mut self, bank: BankKind) -> &mut [u16] {
        match bank {
            BankKind::DiscreteInputs => &mut self.discrete_inputs,
            BankKind::Coils => &mut self.coils,
            BankKind::Holding => &mut self.holding,
            BankKind::Input => &mut self.input,
        }
    }

    fn span(
        &self,
        bank: BankKind,
        address: u16,
        count: usize,
    ) -> Result<std::ops::Range<usize>, RegisterError> {
        let start = usize::from(address);
        let capacity = self.words(bank).len();
        match start.checked_add(count) {
            Some(end) if end <= capacity => Ok(start..end),
            _ => Err(RegisterError::AddressOutOfRange {
                bank,
                address,
                count,
                capacity,
            }),
        }
    }

    /// Read `count` words from any bank
    pub fn read(
        &self,
        bank: BankKind,
        address: u16,
        count: usize,
    ) -> Result<Vec<u16>, RegisterError> {
        let range = self.span(bank, address, count)?;
        Ok(self.words(bank)[range].to_vec())
    }

    /// Write words into any bank, bypassing peer write restrictions
    pub fn write(
        &mut self,
        bank: BankKind,
        address: u16,
        values: &[u16],
    ) -> Result<(), RegisterError> {
        let range = self.span(bank, address, values.len())?;
        self.words_mut(bank)[range].copy_from_slice(values);
        Ok(())
    }

    /// Write on behalf of a remote peer, rejecting read-only banks
    pub fn peer_write(
        &mut self,
        bank: BankKind,
        address: u16,
        values: &[u16],
    ) -> Result<(), RegisterError> {
        if !bank.is_peer_writable() {
            return Err(RegisterError::ReadOnly(bank));
        }
        self.write(bank, address, values)
    }

    pub fn read_discrete_inputs(
        &self,
        address: u16,
        count: usize,
    ) -> Result<Vec<u16>, RegisterError> {
        self.read(BankKind::DiscreteInputs, address, count)
    }

    pub fn write_discrete_inputs(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), RegisterError> {
        self.write(BankKind::DiscreteInputs, address, values)
    }

    pub fn read_coils(&self, address: u16, count: usize) -> Result<Vec<u16>, RegisterError> {
        self.read(BankKind::Coils, address, count)
    }

    pub fn write_coils(&mut self, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        self.write(BankKind::Coils, address, values)
    }

    pub fn read_holding(&self, address: u16, count: usize) -> Result<Vec<u16>, RegisterError> {
        self.read(BankKind::Holding, address, count)
    }

    pub fn write_holding(&mut self, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        self.write(BankKind::Holding, address, values)
    }

    pub fn read_input(&self, address: u16, count: usize) -> Result<Vec<u16>, RegisterError> {
        self.read(BankKind::Input, address, count)
    }

    pub fn write_input(&mut self, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        self.write(BankKind::Input, address, values)
    }

    /// Read a single holding word
    pub fn holding_word(&self, address: u16) -> Result<u16, RegisterError> {
        let range = self.span(BankKind::Holding, address, 1)?;
        Ok(self.holding[range.start])
    }

    /// Read a signed 32-bit holding value spanning `address` and `address + 1`
    pub fn holding_i32(&self, address: u16) -> Result<i32, RegisterError> {
        let range = self.span(BankKind::Holding, address, 2)?;
        decode_i32(&self.holding[range])
    }

    /// Store a signed 32-bit holding value
    pub fn set_holding_i32(&mut self, address: u16, value: i32) -> Result<(), RegisterError> {
        self.write_holding(address, &encode_i32(value))
    }
}
