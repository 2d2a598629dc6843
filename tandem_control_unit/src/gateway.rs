//! Operator gateway: one TCP client, run parameters in, telemetry out.
//!
//! Protocol (text, newline-terminated):
//!
//! ```text
//! server: Hello from server
//! server: Usage: (torque_mA) (sampling_ms)
//! client: 500 200
//! server: 2026-10-19
//! server: TIME,9:5:3,LOAD,480,LIFT,150      (once per cycle)
//! server: Send 'r' to restart
//! client: r
//! ```

use chrono::{Datelike, Local};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::safety::termination::{TerminationLatch, TerminationReason};
use crate::telemetry::StreamSink;

pub const HELLO: &str = "Hello from server\n";
pub const USAGE: &str = "Usage: (torque_mA) (sampling_ms)\n";
pub const RESTART_PROMPT: &str = "Send 'r' to restart\n";

const SEPARATORS: &[char] = &[' ', ',', '.', '-', '\t', '\r', '\n'];

/// Blocking accept/read wake up this often to look at the latch.
const LATCH_POLL: Duration = Duration::from_millis(100);

/// Longest a write to a client that stopped reading may block a cycle.
const WRITE_TIMEOUT: Duration = LATCH_POLL;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid run parameters: {0}")]
    InvalidParams(String),

    #[error("client disconnected")]
    Disconnected,

    /// Termination latched while waiting on the client.
    #[error("interrupted by {0}")]
    Terminated(TerminationReason),
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

fn check_latch(latch: &TerminationLatch) -> Result<(), GatewayError> {
    match latch.reason() {
        Some(reason) => Err(GatewayError::Terminated(reason)),
        None => Ok(()),
    }
}

// ─── Run parameters ─────────────────────────────────────────────────

/// Upper bounds applied to client requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLimits {
    pub max_torque_ma: u32,
    pub max_sample_ms: u32,
}

impl ParamLimits {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_torque_ma: config.max_torque_ma,
            max_sample_ms: config.max_sample_ms,
        }
    }
}

/// Torque limit and sample period of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParameters {
    pub torque_ma: u32,
    pub sample_ms: u32,
}

impl RunParameters {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            torque_ma: config.default_torque_ma,
            sample_ms: config.default_sample_ms,
        }
    }

    /// Parse `"<torque_mA> <sampling_ms>"`.
    ///
    /// Missing values keep `previous`, extra tokens are ignored and values
    /// above the limits are clamped. A zero or non-numeric token rejects
    /// the whole request.
    pub fn parse_request(
        text: &str,
        previous: Self,
        limits: &ParamLimits,
    ) -> Result<Self, GatewayError> {
        let mut params = previous;
        for (i, token) in text
            .split(SEPARATORS)
            .filter(|t| !t.is_empty())
            .enumerate()
        {
            let value = token
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| GatewayError::InvalidParams(format!("bad token '{token}'")))?;
            match i {
                0 => params.torque_ma = value.min(limits.max_torque_ma),
                1 => params.sample_ms = value.min(limits.max_sample_ms),
                _ => {}
            }
        }
        Ok(params)
    }

    #[inline]
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.sample_ms))
    }

    /// Native torque-limit command in amps, e.g. `TC=0.50`.
    pub fn torque_command(&self) -> String {
        format!("TC={:.2}", f64::from(self.torque_ma) / 1000.0)
    }
}

// ─── TCP edge ───────────────────────────────────────────────────────

/// Listening socket.
///
/// Accept and reads give up with [`GatewayError::Terminated`] once the
/// termination latch is set.
pub struct Gateway {
    listener: TcpListener,
    latch: Arc<TerminationLatch>,
}

impl Gateway {
    pub fn bind(addr: &str, latch: Arc<TerminationLatch>) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("Gateway listening on {}", listener.local_addr()?);
        Ok(Self { listener, latch })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GatewayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Block until one client connects, then greet it.
    pub fn accept(&self) -> Result<ClientSession, GatewayError> {
        info!("Waiting for client to connect...");
        let (stream, peer) = loop {
            match self.listener.accept() {
                Ok(accepted) => break accepted,
                Err(e) if is_timeout(&e) => {
                    check_latch(&self.latch)?;
                    thread::sleep(LATCH_POLL);
                }
                Err(e) => return Err(e.into()),
            }
        };
        info!("Client connected from {peer}");
        stream.set_nonblocking(false)?;
        let mut session = ClientSession::new(stream, Arc::clone(&self.latch))?;
        session.send(HELLO)?;
        Ok(session)
    }
}

/// One connected operator client.
pub struct ClientSession {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    latch: Arc<TerminationLatch>,
}

impl ClientSession {
    pub fn new(stream: TcpStream, latch: Arc<TerminationLatch>) -> Result<Self, GatewayError> {
        stream.set_read_timeout(Some(LATCH_POLL))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            latch,
        })
    }

    pub fn send(&mut self, text: &str) -> Result<(), GatewayError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read one line; EOF is [`GatewayError::Disconnected`].
    ///
    /// Invalid UTF-8 is replaced, so garbage reaches the request parser
    /// instead of failing the session.
    pub fn read_line(&mut self) -> Result<String, GatewayError> {
        let mut raw = Vec::new();
        loop {
            match self.reader.read_until(b'\n', &mut raw) {
                Ok(0) if raw.is_empty() => return Err(GatewayError::Disconnected),
                Ok(_) => break,
                // Bytes read before the timeout stay in `raw`.
                Err(e) if is_timeout(&e) => check_latch(&self.latch)?,
                Err(e) => return Err(e.into()),
            }
        }
        let line = String::from_utf8_lossy(&raw).into_owned();
        debug!("Client: {:?}", line.trim_end());
        Ok(line)
    }

    /// Prompt for run parameters; on success answer with today's date.
    pub fn request_params(
        &mut self,
        previous: RunParameters,
        limits: &ParamLimits,
    ) -> Result<RunParameters, GatewayError> {
        self.send(USAGE)?;
        let line = self.read_line()?;
        let params = RunParameters::parse_request(&line, previous, limits)?;
        let today = Local::now().date_naive();
        self.send(&format!(
            "{}-{}-{}\n",
            today.year(),
            today.month(),
            today.day()
        ))?;
        Ok(params)
    }

    /// `true` if the reply to the restart prompt contains `r`.
    pub fn ask_restart(&mut self) -> Result<bool, GatewayError> {
        self.send(RESTART_PROMPT)?;
        Ok(self.read_line()?.contains('r'))
    }

    /// Telemetry sink writing to this client.
    pub fn telemetry_sink(&self) -> Result<StreamSink<TcpStream>, GatewayError> {
        Ok(StreamSink::new(self.writer.try_clone()?))
    }
}
