//! Axis status bits, operating modes and motion parameter types.
//!
//! Enums use `#[repr(u8)]` with `from_u8` so they can be carried in raw
//! driver replies and config files alike.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::consts::{OBJ_POSITION_ACTUAL, OBJ_TORQUE_ACTUAL};

// ─── Status ─────────────────────────────────────────────────────────

bitflags! {
    /// Axis status word as reported by the drive (PLCopen state bits).
    ///
    /// Exactly one of the state bits (`DISABLED`, `STAND_STILL`,
    /// `STOPPING`, `ERROR_STOP`, `HOMING` or one of the motion bits) is
    /// set at a time; `DONE` is an additional completion marker.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AxisStatus: u32 {
        /// Powered off.
        const DISABLED              = 0x0001;
        /// Powered, no motion in progress.
        const STAND_STILL           = 0x0002;
        /// Halted on a drive fault. Cleared only by reset.
        const ERROR_STOP            = 0x0004;
        /// Controlled stop in progress.
        const STOPPING              = 0x0008;
        /// Homing in progress.
        const HOMING                = 0x0010;
        /// Point-to-point move in progress.
        const DISCRETE_MOTION       = 0x0020;
        /// Velocity move in progress.
        const CONTINUOUS_MOTION     = 0x0040;
        /// Geared/cammed motion in progress.
        const SYNCHRONIZED_MOTION   = 0x0080;
        /// Last issued motion command completed.
        const DONE                  = 0x0100;
    }
}

impl AxisStatus {
    /// Bits that indicate an active motion.
    pub const IN_MOTION: Self = Self::DISCRETE_MOTION
        .union(Self::CONTINUOUS_MOTION)
        .union(Self::SYNCHRONIZED_MOTION)
        .union(Self::HOMING)
        .union(Self::STOPPING);

    #[inline]
    pub const fn is_standstill(self) -> bool {
        self.contains(Self::STAND_STILL)
    }

    #[inline]
    pub const fn is_error_stop(self) -> bool {
        self.contains(Self::ERROR_STOP)
    }

    #[inline]
    pub const fn is_disabled(self) -> bool {
        self.contains(Self::DISABLED)
    }

    #[inline]
    pub const fn is_in_motion(self) -> bool {
        self.intersects(Self::IN_MOTION)
    }
}

// ─── Operating mode ─────────────────────────────────────────────────

/// CiA 402 modes of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperatingMode {
    ProfilePosition = 1,
    ProfileVelocity = 3,
    ProfileTorque = 4,
    Homing = 6,
    CyclicSyncPosition = 8,
    CyclicSyncVelocity = 9,
    CyclicSyncTorque = 10,
}

impl OperatingMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ProfilePosition),
            3 => Some(Self::ProfileVelocity),
            4 => Some(Self::ProfileTorque),
            6 => Some(Self::Homing),
            8 => Some(Self::CyclicSyncPosition),
            9 => Some(Self::CyclicSyncVelocity),
            10 => Some(Self::CyclicSyncTorque),
            _ => None,
        }
    }

    /// Modes in which `move_absolute` is accepted.
    #[inline]
    pub const fn accepts_position_moves(self) -> bool {
        matches!(self, Self::ProfilePosition | Self::CyclicSyncPosition)
    }

    /// Modes in which `move_velocity` is accepted.
    #[inline]
    pub const fn accepts_velocity_moves(self) -> bool {
        matches!(
            self,
            Self::ProfileVelocity | Self::CyclicSyncVelocity | Self::ProfilePosition
        )
    }

    /// Position mode a bus of the given kind uses when none is configured.
    #[inline]
    pub const fn default_for(bus: BusKind) -> Self {
        match bus {
            BusKind::EtherCat => Self::CyclicSyncPosition,
            BusKind::Can => Self::ProfilePosition,
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::ProfilePosition
    }
}

/// Field-bus flavour reported by the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum BusKind {
    EtherCat = 0,
    Can = 1,
}

// ─── Motion parameters ──────────────────────────────────────────────

/// How a new motion command interacts with one already executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BufferMode {
    /// Replace the running command immediately.
    Aborting = 0,
    /// Start once the running command has finished.
    Buffered = 1,
    /// Blend with the running command at its target velocity.
    BlendingNext = 2,
}

impl BufferMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Aborting),
            1 => Some(Self::Buffered),
            2 => Some(Self::BlendingNext),
            _ => None,
        }
    }
}

impl Default for BufferMode {
    fn default() -> Self {
        Self::Buffered
    }
}

/// Direction of a velocity move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    Positive = 0,
    Negative = 1,
}

impl Direction {
    /// Sign applied to a velocity magnitude.
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Positive
    }
}

/// Per-axis motion defaults applied once at initialisation.
///
/// Units are drive counts, counts/s, counts/s² and counts/s³.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDefaults {
    pub velocity: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    pub jerk: f64,
    pub direction: Direction,
    pub buffer_mode: BufferMode,
}

impl Default for MotionDefaults {
    fn default() -> Self {
        Self {
            velocity: 100_000.0,
            acceleration: 1_000_000.0,
            deceleration: 1_000_000.0,
            jerk: 20_000_000.0,
            direction: Direction::Positive,
            buffer_mode: BufferMode::Buffered,
        }
    }
}

// ─── Registers ──────────────────────────────────────────────────────

/// Address of one object-dictionary entry read by SDO upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    /// Offset added to the axis' bus node id.
    pub node_offset: u8,
    /// Object index, e.g. `0x6077`.
    pub object_id: u16,
    pub subindex: u8,
    /// Length in bytes.
    pub length: u8,
}

impl Register {
    /// Torque actual value in tens of milliamps.
    pub const TORQUE_ACTUAL: Self = Self::new(OBJ_TORQUE_ACTUAL, 0);
    /// Position actual value in counts.
    pub const POSITION_ACTUAL: Self = Self::new(OBJ_POSITION_ACTUAL, 0);

    /// 4-byte register at node offset 0.
    pub const fn new(object_id: u16, subindex: u8) -> Self {
        Self {
            node_offset: 0,
            object_id,
            subindex,
            length: 4,
        }
    }
}

/// Opaque handle returned by a successful bus connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u32);
