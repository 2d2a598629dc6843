//! Control-unit error taxonomy.
//!
//! Every fatal condition ends up as a [`ControlError`] at the session
//! boundary, which performs the safe shutdown and maps the error to a
//! process exit code.

use tandem_common::config::ConfigError;
use tandem_common::drive::driver::DriveError;
use tandem_common::drive::types::OperatingMode;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::safety::termination::TerminationReason;

/// Errors raised by the motion engine.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Driver-level failure. Never resumed.
    #[error(transparent)]
    Drive(#[from] DriveError),

    /// Error-stop still set after the single startup reset.
    #[error("Axis {axis} in Error Stop (status={status:#06x}). Aborting.")]
    PersistentErrorStop { axis: String, status: u32 },

    /// Error-stop reported while the sequence was running.
    #[error("Error Stop during run, axis ref={axis}, err={code}, status={status}, {axis_ref}")]
    ErrorStop {
        axis: String,
        axis_ref: u16,
        code: i32,
        status: u32,
    },

    /// A convergence poll exhausted its bound.
    #[error("Axis {axis}: {what} not reached after {polls} polls")]
    ConvergenceTimeout {
        axis: String,
        what: &'static str,
        polls: u32,
    },

    /// A process waited in one sub-state longer than allowed.
    #[error("{process} process stuck in {step} for {cycles} cycles")]
    StepTimeout {
        process: &'static str,
        step: &'static str,
        cycles: u32,
    },

    /// Motion command for a mode the drive has not confirmed.
    #[error("Axis {axis}: mode {expected:?} required, drive confirmed {actual:?}")]
    ModeMismatch {
        axis: String,
        expected: &'static str,
        actual: Option<OperatingMode>,
    },

    /// Shutdown requested by signal, operator or drive event.
    #[error("terminated: {0}")]
    Terminated(TerminationReason),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("signal setup error: {0}")]
    Signal(String),

    /// A cycle panicked; the guard was released during unwinding.
    #[error("cycle panicked: {0}")]
    CyclePanic(String),
}

impl ControlError {
    /// Process exit code for this error.
    ///
    /// Signal-initiated and operator terminations exit 0, everything else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Terminated(reason) => reason.exit_code(),
            _ => 1,
        }
    }

    /// The driver error behind this error, if any.
    pub fn drive_error(&self) -> Option<&DriveError> {
        match self {
            Self::Drive(e) => Some(e),
            _ => None,
        }
    }
}
