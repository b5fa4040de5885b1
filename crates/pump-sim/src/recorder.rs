//! CSV telemetry recorder
//!
//! Appends one row per station tick. The header is written lazily before the
//! first row so an unused recorder leaves its sink untouched.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use tracing::info;

use crate::model::PumpSample;

/// Column header for recorded telemetry
pub const CSV_HEADER: &str =
    "time,mode,pump1_rpm,pump1_power,pump1_outflow,pump2_rpm,pump2_power,pump2_outflow";

/// Writes pump samples as CSV rows
pub struct TelemetryRecorder<W: Write> {
    writer: W,
    header_written: bool,
    rows: u64,
}

impl TelemetryRecorder<BufWriter<File>> {
    /// Create (or truncate) a CSV file at `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("Recording telemetry to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TelemetryRecorder<W> {
    /// Wrap an arbitrary sink
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            rows: 0,
        }
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Append one row and flush it
    pub fn record(
        &mut self,
        at: SystemTime,
        mode: &str,
        pumps: &[PumpSample; 2],
    ) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.writer, "{}", CSV_HEADER)?;
            self.header_written = true;
        }

        let [p1, p2] = pumps;
        writeln!(
            self.writer,
            "{},{},{:.0},{:.4},{:.4},{:.0},{:.4},{:.4}",
            format_timestamp(at),
            mode,
            p1.speed,
            p1.power,
            p1.outflow,
            p2.speed,
            p2.power,
            p2.outflow
        )?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Consume the recorder and return the sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Seconds since the Unix epoch with millisecond precision
fn format_timestamp(at: SystemTime) -> String {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}
