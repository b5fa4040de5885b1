//! Station actor
//!
//! This module provides the async task that owns the [`ControlArbiter`] and
//! the [`RegisterBank`]. Nothing else touches either: the serving side (the
//! wire transport, or an in-process client) sends [`StationCommand`]s through
//! a [`StationHandle`], and the actor answers them between ticks. Because
//! every read and write is handled as one message, a peer never observes a
//! 32-bit value whose two words come from different ticks.
//!
//! # Example
//!
//! ```rust,no_run
//! use pump_registers::BankKind;
//! use pump_station::{spawn_station, StationConfig};
//!
//! # async fn demo() -> Result<(), pump_station::StationError> {
//! let (station, task) = spawn_station(StationConfig::default())?;
//!
//! let telemetry = station.read_registers(BankKind::Input, 0, 13).await?;
//! println!("{:?}", telemetry);
//!
//! station.shutdown().await?;
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::time::SystemTime;

use pump_registers::{BankKind, RegisterBank, RegisterError};
use pump_sim::{PumpSample, TelemetryRecorder};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::arbiter::ControlArbiter;
use crate::config::StationConfig;
use crate::error::StationError;
use crate::events::StationEvent;
use crate::state::{ControlMode, TickReport};

/// Commands sent to the station actor
#[derive(Debug)]
pub enum StationCommand {
    /// Read words from a bank
    ReadRegisters {
        bank: BankKind,
        address: u16,
        count: usize,
        /// Channel to send back the words
        response: oneshot::Sender<Result<Vec<u16>, RegisterError>>,
    },

    /// Write words on behalf of a remote peer
    WriteRegisters {
        bank: BankKind,
        address: u16,
        words: Vec<u16>,
        /// Channel to send back the outcome
        response: oneshot::Sender<Result<(), RegisterError>>,
    },

    /// Fetch the most recent tick report
    Snapshot {
        response: oneshot::Sender<Option<TickReport>>,
    },

    /// Stop the actor
    Shutdown,
}

/// Cloneable handle to a running station
#[derive(Debug, Clone)]
pub struct StationHandle {
    cmd_tx: mpsc::Sender<StationCommand>,
    event_tx: broadcast::Sender<StationEvent>,
}

impl StationHandle {
    /// Create a handle from raw channels
    pub fn new(
        cmd_tx: mpsc::Sender<StationCommand>,
        event_tx: broadcast::Sender<StationEvent>,
    ) -> Self {
        Self { cmd_tx, event_tx }
    }

    /// Whether the actor has stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Subscribe to station events
    pub fn subscribe(&self) -> broadcast::Receiver<StationEvent> {
        self.event_tx.subscribe()
    }

    /// Read `count` words starting at `address`
    pub async fn read_registers(
        &self,
        bank: BankKind,
        address: u16,
        count: usize,
    ) -> Result<Vec<u16>, StationError> {
        let (response, rx) = oneshot::channel();
        self.send(StationCommand::ReadRegisters {
            bank,
            address,
            count,
            response,
        })
        .await?;
        Ok(rx.await.map_err(|_| StationError::StationClosed)??)
    }

    /// Write words as a remote peer would
    pub async fn write_registers(
        &self,
        bank: BankKind,
        address: u16,
        words: &[u16],
    ) -> Result<(), StationError> {
        let (response, rx) = oneshot::channel();
        self.send(StationCommand::WriteRegisters {
            bank,
            address,
            words: words.to_vec(),
            response,
        })
        .await?;
        Ok(rx.await.map_err(|_| StationError::StationClosed)??)
    }

    /// Most recent tick report, if any tick has run
    pub async fn snapshot(&self) -> Result<Option<TickReport>, StationError> {
        let (response, rx) = oneshot::channel();
        self.send(StationCommand::Snapshot { response }).await?;
        rx.await.map_err(|_| StationError::StationClosed)
    }

    /// Ask the actor to stop
    pub async fn shutdown(&self) -> Result<(), StationError> {
        self.send(StationCommand::Shutdown).await
    }

    async fn send(&self, cmd: StationCommand) -> Result<(), StationError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| StationError::StationClosed)
    }
}

/// Validate `config`, then spawn a station with entropy-seeded randomness
///
/// Must be called from within a tokio runtime.
pub fn spawn_station(
    config: StationConfig,
) -> Result<(StationHandle, JoinHandle<Result<(), StationError>>), StationError> {
    let arbiter = ControlArbiter::new(&config);
    spawn_station_with_arbiter(config, arbiter)
}

/// Spawn a station around a prepared arbiter
///
/// Opens the telemetry log (if configured) before spawning so file errors
/// surface to the caller.
pub fn spawn_station_with_arbiter(
    config: StationConfig,
    arbiter: ControlArbiter,
) -> Result<(StationHandle, JoinHandle<Result<(), StationError>>), StationError> {
    config.validate()?;
    let recorder = match &config.telemetry_log {
        Some(path) => Some(TelemetryRecorder::create(path)?),
        None => None,
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let (event_tx, _) = broadcast::channel(config.event_buffer);
    let handle = StationHandle::new(cmd_tx, event_tx.clone());

    let task = tokio::spawn(run_station_actor(
        config, arbiter, recorder, cmd_rx, event_tx,
    ));
    Ok((handle, task))
}

/// One tick queued for the telemetry log
struct LogRow {
    at: SystemTime,
    mode: ControlMode,
    samples: [PumpSample; 2],
}

/// Move the recorder onto the blocking pool and feed it through a channel
fn spawn_log_writer<W: Write + Send + 'static>(
    mut recorder: TelemetryRecorder<W>,
    capacity: usize,
) -> (mpsc::Sender<LogRow>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<LogRow>(capacity);
    let task = tokio::task::spawn_blocking(move || {
        while let Some(row) = rx.blocking_recv() {
            if let Err(e) = recorder.record(row.at, row.mode.name(), &row.samples) {
                warn!("Telemetry log write failed, disabling recorder: {}", e);
                return;
            }
        }
        debug!("Telemetry log closed after {} rows", recorder.rows());
    });
    (tx, task)
}

/// Run the station actor until shutdown or until every handle is dropped
///
/// The first tick fires immediately; later ticks follow the configured
/// period. Late ticks are skipped rather than bunched so the cadence does
/// not drift. File I/O for the telemetry log happens on the blocking pool;
/// if the writer falls a full event buffer behind, rows are dropped rather
/// than stalling the tick loop.
pub async fn run_station_actor<W: Write + Send + 'static>(
    config: StationConfig,
    mut arbiter: ControlArbiter,
    recorder: Option<TelemetryRecorder<W>>,
    mut cmd_rx: mpsc::Receiver<StationCommand>,
    event_tx: broadcast::Sender<StationEvent>,
) -> Result<(), StationError> {
    let mut bank = RegisterBank::new(config.bank_capacity);
    let mut last_report: Option<TickReport> = None;

    let (mut log_tx, log_task) = match recorder {
        Some(recorder) => {
            let (tx, task) = spawn_log_writer(recorder, config.event_buffer);
            (Some(tx), Some(task))
        }
        None => (None, None),
    };

    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Station actor started (tick {} ms, alternation every {} ticks)",
        config.tick_interval_ms, config.alternation_interval_ticks
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = match arbiter.tick(&mut bank) {
                    Ok(report) => report,
                    Err(e) => {
                        error!("Station tick failed: {}", e);
                        return Err(e.into());
                    }
                };

                if report.mode_changed() {
                    info!("Control mode {} -> {}", report.previous_mode, report.mode);
                    let _ = event_tx.send(StationEvent::ModeChanged {
                        from: report.previous_mode,
                        to: report.mode,
                    });
                }
                if let (Some(active), Some(previous)) = (
                    report.active_pump,
                    last_report.as_ref().and_then(|r| r.active_pump),
                ) {
                    if active != previous {
                        let _ = event_tx.send(StationEvent::PumpAlternated { active });
                    }
                }

                let log_closed = log_tx.as_ref().is_some_and(|tx| {
                    let row = LogRow {
                        at: SystemTime::now(),
                        mode: report.mode,
                        samples: report.samples,
                    };
                    match tx.try_send(row) {
                        Ok(()) => false,
                        Err(TrySendError::Full(_)) => {
                            warn!("Telemetry log is behind, dropping tick {}", report.tick);
                            false
                        }
                        Err(TrySendError::Closed(_)) => true,
                    }
                });
                if log_closed {
                    log_tx = None;
                }

                let _ = event_tx.send(StationEvent::Tick(report.clone()));
                last_report = Some(report);
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("All station handles dropped");
                    break;
                };
                match cmd {
                    StationCommand::ReadRegisters { bank: kind, address, count, response } => {
                        let result = bank.read(kind, address, count);
                        if let Err(e) = &result {
                            warn!("Rejected read: {}", e);
                        }
                        let _ = response.send(result);
                    }

                    StationCommand::WriteRegisters { bank: kind, address, words, response } => {
                        let result = bank.peer_write(kind, address, &words);
                        match &result {
                            Ok(()) => {
                                debug!("Peer wrote {} {} register(s) at {}: {:?}", words.len(), kind, address, words);
                                let _ = event_tx.send(StationEvent::RegistersWritten {
                                    bank: kind,
                                    address,
                                    count: words.len(),
                                });
                            }
                            Err(e) => warn!("Rejected write: {}", e),
                        }
                        let _ = response.send(result);
                    }

                    StationCommand::Snapshot { response } => {
                        let _ = response.send(last_report.clone());
                    }

                    StationCommand::Shutdown => {
                        info!("Shutdown requested for station actor");
                        break;
                    }
                }
            }
        }
    }

    drop(log_tx);
    if let Some(task) = log_task {
        if let Err(e) = task.await {
            warn!("Telemetry log writer failed: {}", e);
        }
    }

    info!("Station actor stopped after {} ticks", arbiter.ticks());
    Ok(())
}
