//! Driver traits and error types.
//!
//! This module defines:
//! - `FieldBus` trait - one bus connection (EtherCAT master, CAN gateway, simulation)
//! - `AxisDriver` trait - one drive on that bus
//! - `DriveError` enum - the driver-level error taxonomy
//! - `BusFactory` type alias - factory function type for the driver registry

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::event::DriveEventHandler;
use super::types::{
    AxisStatus, BufferMode, BusKind, ConnectionHandle, Direction, MotionDefaults, OperatingMode,
    Register,
};

// ─── Error codes ────────────────────────────────────────────────────

/// Command requires a powered axis.
pub const ERR_NOT_POWERED: i32 = -1;
/// Command not valid in the current operating mode.
pub const ERR_WRONG_MODE: i32 = -2;
/// Axis is in error-stop.
pub const ERR_ERROR_STOP: i32 = -3;
/// Native command not understood.
pub const ERR_BAD_COMMAND: i32 = -4;
/// Object-dictionary entry does not exist.
pub const ERR_NO_OBJECT: i32 = -5;
/// Bus communication failure.
pub const ERR_COMMUNICATION: i32 = -6;

/// Error types for driver operations.
#[derive(Debug, Clone, Error)]
pub enum DriveError {
    /// A drive rejected or failed a command.
    #[error(
        "Exception in function {function}, axis ref={axis}, err={code}, status={}, {axis_ref}",
        .status.bits()
    )]
    Axis {
        function: &'static str,
        axis: String,
        axis_ref: u16,
        code: i32,
        status: AxisStatus,
    },

    /// Bus connection could not be established or was lost.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// No axis with the given name on the bus.
    #[error("Axis not found: {0}")]
    AxisNotFound(String),

    /// Driver not registered.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Anything the driver could not classify.
    #[error("Driver error: {0}")]
    Other(String),
}

impl DriveError {
    /// Build an [`DriveError::Axis`] error.
    pub fn axis(
        function: &'static str,
        axis: &str,
        axis_ref: u16,
        code: i32,
        status: AxisStatus,
    ) -> Self {
        Self::Axis {
            function,
            axis: axis.to_string(),
            axis_ref,
            code,
            status,
        }
    }

    /// Driver error code, if the error came from a drive.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Axis { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Factory function type for creating bus instances.
pub type BusFactory = fn() -> Box<dyn FieldBus>;

// ─── Traits ─────────────────────────────────────────────────────────

/// One physical drive on a field bus.
///
/// All calls are synchronous round-trips on the bus. Power and mode
/// changes are only *requested*: the caller polls `read_status` /
/// `operating_mode` until the drive reports the new state.
pub trait AxisDriver: Send {
    /// Logical axis name used at init (e.g. `"lift"`).
    fn name(&self) -> &str;

    /// Numeric axis reference assigned by the bus.
    fn axis_ref(&self) -> u16;

    /// Store default velocity, acceleration, deceleration, jerk, direction and buffer mode.
    fn set_defaults(&mut self, defaults: &MotionDefaults) -> Result<(), DriveError>;

    /// Request energize. Returns before the drive is enabled.
    fn power_on(&mut self, buffer: BufferMode) -> Result<(), DriveError>;

    /// Request de-energize. Returns before the drive is disabled.
    fn power_off(&mut self, buffer: BufferMode) -> Result<(), DriveError>;

    fn read_status(&mut self) -> Result<AxisStatus, DriveError>;

    /// Request a mode change. Takes effect asynchronously.
    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<(), DriveError>;

    /// Mode currently reported by the drive.
    fn operating_mode(&mut self) -> Result<OperatingMode, DriveError>;

    /// Point-to-point move to `position` at `velocity`.
    ///
    /// # Errors
    /// Fails with [`ERR_NOT_POWERED`] or [`ERR_WRONG_MODE`] when the drive
    /// cannot accept the move.
    fn move_absolute(
        &mut self,
        position: f64,
        velocity: f64,
        buffer: BufferMode,
    ) -> Result<(), DriveError>;

    /// Continuous move until `stop()`.
    fn move_velocity(&mut self, velocity: f64, direction: Direction) -> Result<(), DriveError>;

    /// Controlled stop with the configured deceleration.
    fn stop(&mut self) -> Result<(), DriveError>;

    /// Clear an error-stop. The caller must re-read status afterwards.
    fn reset(&mut self) -> Result<(), DriveError>;

    /// SDO upload of one object-dictionary entry.
    fn upload_register(&mut self, register: Register) -> Result<i32, DriveError>;

    /// Send a native drive command (`"UM=1"`, `"TC=0.50"`) and return the reply.
    fn execute(&mut self, command: &str) -> Result<String, DriveError>;

    /// Actual position in counts.
    fn actual_position(&mut self) -> Result<f64, DriveError>;
}

/// A field-bus connection that owns the drives behind it.
///
/// # Lifecycle
///
/// 1. `connect()` - once, before any axis is initialised
/// 2. `init_axis()` - once per logical axis
/// 3. `close()` - at shutdown, after every axis is powered off
pub trait FieldBus: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Open the connection and register the event handler.
    fn connect(
        &mut self,
        timeout: Duration,
        events: Arc<dyn DriveEventHandler>,
    ) -> Result<ConnectionHandle, DriveError>;

    /// Bus flavour, valid after `connect()`.
    fn bus_kind(&self) -> BusKind;

    /// Bind a logical axis name to a drive on the bus.
    fn init_axis(
        &mut self,
        name: &str,
        handle: ConnectionHandle,
    ) -> Result<Box<dyn AxisDriver>, DriveError>;

    /// Release the connection. Idempotent.
    fn close(&mut self, handle: ConnectionHandle) -> Result<(), DriveError>;
}
