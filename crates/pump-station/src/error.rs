//! Error types for the station and its clients

use pump_registers::RegisterError;
use pump_sim::ModelConfigError;
use thiserror::Error;

/// Errors raised by the station actor and its handle
#[derive(Debug, Error)]
pub enum StationError {
    /// Register access failed
    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    /// The station actor is no longer running
    #[error("station actor has stopped")]
    StationClosed,

    /// I/O error (telemetry log, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration parsed but is unusable
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Process model bounds are unusable
    #[error("invalid model config: {0}")]
    Model(#[from] ModelConfigError),
}

/// Errors surfaced by a [`RegisterTransport`](crate::transport::RegisterTransport)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connection is established
    #[error("not connected")]
    Disconnected,

    /// A connection attempt failed
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The station refused the request
    #[error("request rejected: {0}")]
    Rejected(#[from] RegisterError),
}

impl TransportError {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Errors returned by the polling client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The station rejected the request; retrying will not help
    #[error("station rejected request: {0}")]
    Register(#[from] RegisterError),

    /// Every attempt failed
    #[error("station unavailable after {attempts} attempts: {last}")]
    Unavailable {
        /// Attempts made, including the first
        attempts: u32,
        /// Error from the final attempt
        last: TransportError,
    },
}
