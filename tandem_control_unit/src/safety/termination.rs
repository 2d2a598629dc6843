//! Termination latch and OS signal handlers.
//!
//! The latch is a single atomic byte: the first reason stored wins and
//! later triggers are ignored. Signal handlers only store into it; the
//! scheduler observes it at the top of each outer-loop iteration.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::error::ControlError;

/// Why the process is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TerminationReason {
    /// SIGINT.
    Interrupt = 1,
    /// SIGTERM.
    Terminate = 2,
    /// SIGABRT.
    Abort = 3,
    /// SIGQUIT.
    Quit = 4,
    /// Client declined a restart or disconnected.
    Operator = 5,
    /// Emergency or system-error event from the drive.
    DriveEvent = 6,
    Fault = 7,
}

impl TerminationReason {
    #[inline]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Interrupt),
            2 => Some(Self::Terminate),
            3 => Some(Self::Abort),
            4 => Some(Self::Quit),
            5 => Some(Self::Operator),
            6 => Some(Self::DriveEvent),
            7 => Some(Self::Fault),
            _ => None,
        }
    }

    pub const fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::SIGINT => Some(Self::Interrupt),
            Signal::SIGTERM => Some(Self::Terminate),
            Signal::SIGABRT => Some(Self::Abort),
            Signal::SIGQUIT => Some(Self::Quit),
            _ => None,
        }
    }

    /// 0 for graceful terminations, 1 otherwise.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt | Self::Terminate | Self::Operator => 0,
            Self::Abort | Self::Quit | Self::DriveEvent | Self::Fault => 1,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Abort => "SIGABRT",
            Self::Quit => "SIGQUIT",
            Self::Operator => "operator request",
            Self::DriveEvent => "drive event",
            Self::Fault => "fault",
        };
        f.write_str(s)
    }
}

/// First-reason-wins shutdown flag.
#[derive(Debug, Default)]
pub struct TerminationLatch {
    reason: AtomicU8,
}

impl TerminationLatch {
    pub const fn new() -> Self {
        Self {
            reason: AtomicU8::new(0),
        }
    }

    /// Store `reason` unless a reason is already latched.
    ///
    /// Returns `true` if this call set the latch. Async-signal-safe.
    #[inline]
    pub fn trigger(&self, reason: TerminationReason) -> bool {
        self.reason
            .compare_exchange(0, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn reason(&self) -> Option<TerminationReason> {
        TerminationReason::from_u8(self.reason.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.reason.load(Ordering::Acquire) != 0
    }

    /// `Err(Terminated)` once latched.
    pub fn check(&self) -> Result<(), ControlError> {
        match self.reason() {
            Some(reason) => Err(ControlError::Terminated(reason)),
            None => Ok(()),
        }
    }
}

// ─── Signal handlers ────────────────────────────────────────────────

static SIGNAL_LATCH: OnceLock<Arc<TerminationLatch>> = OnceLock::new();

extern "C" fn on_signal(signum: libc::c_int) {
    let reason = Signal::try_from(signum)
        .ok()
        .and_then(TerminationReason::from_signal);
    if let (Some(latch), Some(reason)) = (SIGNAL_LATCH.get(), reason) {
        latch.trigger(reason);
    }
}

const HANDLED_SIGNALS: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGABRT,
    Signal::SIGQUIT,
];

/// Route SIGINT, SIGTERM, SIGABRT and SIGQUIT into `latch`.
///
/// Only the first installed latch is used for the process lifetime.
pub fn install_signal_handlers(latch: Arc<TerminationLatch>) -> Result<(), ControlError> {
    if SIGNAL_LATCH.set(latch).is_err() {
        debug!("Signal handlers already installed");
        return Ok(());
    }

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in HANDLED_SIGNALS {
        // SAFETY: `on_signal` only performs atomic loads and a CAS.
        unsafe { sigaction(signal, &action) }
            .map_err(|e| ControlError::Signal(format!("sigaction({signal}) failed: {e}")))?;
    }
    debug!("Signal handlers installed for {HANDLED_SIGNALS:?}");
    Ok(())
}
