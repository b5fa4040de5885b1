//! Register transport seam
//!
//! The polling client talks to a station through [`RegisterTransport`]: the
//! two register primitives plus connection state. A wire implementation
//! (Modbus TCP or similar) lives outside this crate; [`LocalTransport`]
//! connects in-process through a [`StationHandle`].

use std::future::Future;

use pump_registers::BankKind;
use tracing::debug;

use crate::actor::StationHandle;
use crate::error::{StationError, TransportError};

/// Connection-oriented access to a station's registers
pub trait RegisterTransport: Send {
    /// Whether a connection is currently established
    fn is_connected(&self) -> bool;

    /// Establish a connection
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read `count` words starting at `address`
    fn read_registers(
        &mut self,
        bank: BankKind,
        address: u16,
        count: usize,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Write `words` starting at `address`
    fn write_registers(
        &mut self,
        bank: BankKind,
        address: u16,
        words: &[u16],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// In-process transport backed by a station actor
#[derive(Debug, Clone)]
pub struct LocalTransport {
    station: StationHandle,
    connected: bool,
}

impl LocalTransport {
    /// Create a disconnected transport for `station`
    pub fn new(station: StationHandle) -> Self {
        Self {
            station,
            connected: false,
        }
    }

    fn check_connected(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }

    fn map_error(&mut self, err: StationError) -> TransportError {
        match err {
            StationError::Register(e) => TransportError::Rejected(e),
            other => {
                debug!("Local transport lost station: {}", other);
                self.connected = false;
                TransportError::Disconnected
            }
        }
    }
}

impl RegisterTransport for LocalTransport {
    fn is_connected(&self) -> bool {
        self.connected && !self.station.is_closed()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.station.is_closed() {
            self.connected = false;
            return Err(TransportError::ConnectFailed(
                "station is not running".to_string(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn read_registers(
        &mut self,
        bank: BankKind,
        address: u16,
        count: usize,
    ) -> Result<Vec<u16>, TransportError> {
        self.check_connected()?;
        match self.station.read_registers(bank, address, count).await {
            Ok(words) => Ok(words),
            Err(e) => Err(self.map_error(e)),
        }
    }

    async fn write_registers(
        &mut self,
        bank: BankKind,
        address: u16,
        words: &[u16],
    ) -> Result<(), TransportError> {
        self.check_connected()?;
        match self.station.write_registers(bank, address, words).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.map_error(e)),
        }
    }
}
