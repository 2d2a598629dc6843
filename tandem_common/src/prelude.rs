//! Prelude module for common re-exports.
//!
//! ```rust
//! use tandem_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Driver boundary ────────────────────────────────────────────────
pub use crate::drive::driver::{AxisDriver, BusFactory, DriveError, FieldBus};
pub use crate::drive::event::{DriveEvent, DriveEventHandler, DriveEventKind};
pub use crate::drive::types::{
    AxisStatus, BufferMode, BusKind, ConnectionHandle, Direction, MotionDefaults, OperatingMode,
    Register,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXIS_COUNT, MAX_WAYPOINTS};
