//! Telemetry records and sinks.
//!
//! One record per executed cycle:
//!
//! ```text
//! TIME,<h:m:s>,LOAD,<mA>,LIFT,<mA>
//! ```
//!
//! plus an empty line in every cycle that issues a new waypoint. Sinks
//! report I/O errors; the cycle logs them and carries on.

use chrono::{NaiveTime, Timelike};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Values captured in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySample {
    pub time: NaiveTime,
    pub load_ma: i32,
    pub lift_ma: i32,
    /// Load position register [counts]; logged, not streamed.
    pub load_position: i32,
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TIME,{}:{}:{},LOAD,{},LIFT,{}",
            self.time.hour(),
            self.time.minute(),
            self.time.second(),
            self.load_ma,
            self.lift_ma
        )
    }
}

/// Destination of telemetry lines.
pub trait TelemetrySink: Send {
    /// Write `line` followed by `\n`.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Any `Write`, flushed after every line.
pub struct StreamSink<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> TelemetrySink for StreamSink<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps lines in memory; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}
