//! Polling client
//!
//! The [`PollingClient`] reads a station's telemetry and can take control of
//! it by writing the control flag and pump setpoints. It connects lazily and
//! reconnects whenever the transport reports it is down. Each request is
//! retried with exponential backoff; only when every attempt fails does the
//! caller see [`ClientError::Unavailable`].
//!
//! # Example
//!
//! ```rust,no_run
//! use pump_registers::PumpId;
//! use pump_station::{spawn_station, ClientConfig, LocalTransport, PollingClient, StationConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (station, _task) = spawn_station(StationConfig::default())?;
//! let mut client = PollingClient::new(LocalTransport::new(station), ClientConfig::default());
//!
//! client.toggle_control().await?;
//! client.set_pump_speed(PumpId::One, 1250).await?;
//! let snapshot = client.poll().await?;
//! println!("pump 1 at {} rpm", snapshot.pump1_speed);
//! # Ok(())
//! # }
//! ```

use pump_registers::codec::encode_i32;
use pump_registers::map::{CONTROL_HR, CONTROL_IR, TELEMETRY_BASE_IR, TELEMETRY_WORDS};
use pump_registers::{BankKind, PumpId, TelemetryFrame};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::transport::RegisterTransport;

/// Decoded station telemetry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StationSnapshot {
    /// Whether the station is following external setpoints
    pub in_control: bool,
    pub pump1_speed: i32,
    pub pump2_speed: i32,
    pub pump1_power: f32,
    pub pump2_power: f32,
    pub pump1_outflow: f32,
    pub pump2_outflow: f32,
}

impl From<TelemetryFrame> for StationSnapshot {
    fn from(frame: TelemetryFrame) -> Self {
        let [p1, p2] = frame.pumps;
        Self {
            in_control: frame.in_control,
            pump1_speed: p1.speed,
            pump2_speed: p2.speed,
            pump1_power: p1.power,
            pump2_power: p2.power,
            pump1_outflow: p1.outflow,
            pump2_outflow: p2.outflow,
        }
    }
}

/// A single register operation, replayable across retries
#[derive(Debug, Clone, Copy)]
enum Request<'a> {
    Read {
        bank: BankKind,
        address: u16,
        count: usize,
    },
    Write {
        bank: BankKind,
        address: u16,
        words: &'a [u16],
    },
}

/// Client that polls and commands a station over a [`RegisterTransport`]
pub struct PollingClient<T> {
    transport: T,
    config: ClientConfig,
    transient_failures: u64,
}

impl<T: RegisterTransport> PollingClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            transient_failures: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Failed attempts that were later retried
    pub fn transient_failures(&self) -> u64 {
        self.transient_failures
    }

    /// Read the control flag and all six telemetry fields in one request
    pub async fn poll(&mut self) -> Result<StationSnapshot, ClientError> {
        let words = self
            .execute(Request::Read {
                bank: BankKind::Input,
                address: TELEMETRY_BASE_IR,
                count: TELEMETRY_WORDS,
            })
            .await?;
        Ok(TelemetryFrame::decode(&words)?.into())
    }

    /// Whether the station currently reports external control
    pub async fn in_control(&mut self) -> Result<bool, ClientError> {
        let words = self
            .execute(Request::Read {
                bank: BankKind::Input,
                address: CONTROL_IR,
                count: 1,
            })
            .await?;
        Ok(words.first().is_some_and(|&flag| flag != 0))
    }

    /// Flip the control flag and return the value written
    ///
    /// The current state is taken from the station's echo, so a toggle issued
    /// before the next tick reads the previous mode.
    pub async fn toggle_control(&mut self) -> Result<bool, ClientError> {
        let take = !self.in_control().await?;
        self.execute(Request::Write {
            bank: BankKind::Holding,
            address: CONTROL_HR,
            words: &[u16::from(take)],
        })
        .await?;
        info!(
            "Requested {} control",
            if take { "external" } else { "local" }
        );
        Ok(take)
    }

    /// Write a speed setpoint for `pump`
    ///
    /// The station clamps out-of-range values; they are not rejected here.
    pub async fn set_pump_speed(&mut self, pump: PumpId, speed: i32) -> Result<(), ClientError> {
        let words = encode_i32(speed);
        self.execute(Request::Write {
            bank: BankKind::Holding,
            address: pump.setpoint_address(),
            words: &words,
        })
        .await?;
        debug!("Set {} setpoint to {}", pump, speed);
        Ok(())
    }

    /// Poll at the configured cadence until `shutdown` fires
    ///
    /// Each snapshot is forwarded to `snapshots`. Poll failures are logged and
    /// the loop carries on; it also stops if the snapshot receiver is dropped.
    pub async fn run(
        &mut self,
        mut shutdown: oneshot::Receiver<()>,
        snapshots: mpsc::Sender<StationSnapshot>,
    ) {
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling client started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    break;
                }

                _ = ticker.tick() => {
                    match self.poll().await {
                        Ok(snapshot) => {
                            info!(
                                "Control: {}, P1 speed: {}, P2 speed: {}, P1 outflow: {:.2}, P2 outflow: {:.2}, P1 power: {:.2}, P2 power: {:.2}",
                                snapshot.in_control,
                                snapshot.pump1_speed,
                                snapshot.pump2_speed,
                                snapshot.pump1_outflow,
                                snapshot.pump2_outflow,
                                snapshot.pump1_power,
                                snapshot.pump2_power
                            );
                            if snapshots.send(snapshot).await.is_err() {
                                debug!("Snapshot receiver dropped");
                                break;
                            }
                        }
                        Err(e) => warn!("Poll failed: {}", e),
                    }
                }
            }
        }

        info!("Polling client stopped");
    }

    async fn execute(&mut self, request: Request<'_>) -> Result<Vec<u16>, ClientError> {
        let attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.initial_backoff();
        let mut last = TransportError::Disconnected;

        for attempt in 1..=attempts {
            match self.attempt(request).await {
                Ok(words) => return Ok(words),
                Err(TransportError::Rejected(e)) => return Err(ClientError::Register(e)),
                Err(e) => {
                    warn!("Request attempt {}/{} failed: {}", attempt, attempts, e);
                    last = e;
                }
            }

            if attempt < attempts {
                self.transient_failures += 1;
                sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff());
            }
        }

        Err(ClientError::Unavailable { attempts, last })
    }

    async fn attempt(&mut self, request: Request<'_>) -> Result<Vec<u16>, TransportError> {
        if !self.transport.is_connected() {
            info!("Connecting to station");
            self.transport.connect().await?;
        }

        match request {
            Request::Read {
                bank,
                address,
                count,
            } => self.transport.read_registers(bank, address, count).await,
            Request::Write {
                bank,
                address,
                words,
            } => self
                .transport
                .write_registers(bank, address, words)
                .await
                .map(|()| Vec::new()),
        }
    }
}
