//! Asynchronous events delivered by the bus connection.

use serde::{Deserialize, Serialize};

/// Kind of an asynchronous drive event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DriveEventKind {
    /// Drive emergency object (EMCY).
    Emergency = 0,
    MotionEnded = 1,
    HeartbeatFail = 2,
    DriveError = 3,
    PdoReceived = 4,
    HomeEnded = 5,
    /// Bus master or network failure.
    SystemError = 6,
}

impl DriveEventKind {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Emergency),
            1 => Some(Self::MotionEnded),
            2 => Some(Self::HeartbeatFail),
            3 => Some(Self::DriveError),
            4 => Some(Self::PdoReceived),
            5 => Some(Self::HomeEnded),
            6 => Some(Self::SystemError),
            _ => None,
        }
    }

    /// Events that must stop the machine.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Emergency | Self::SystemError)
    }
}

/// One event as received from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveEvent {
    pub kind: DriveEventKind,
    /// Axis reference the event originates from (0 for bus-wide events).
    pub axis_ref: u16,
    /// Driver-specific error or event code.
    pub code: i32,
}

impl DriveEvent {
    pub const fn new(kind: DriveEventKind, axis_ref: u16, code: i32) -> Self {
        Self {
            kind,
            axis_ref,
            code,
        }
    }
}

/// Receiver of drive events.
///
/// Called from the driver's own context, possibly on another thread.
/// Implementations must not block.
pub trait DriveEventHandler: Send + Sync {
    fn on_event(&self, event: &DriveEvent);
}
