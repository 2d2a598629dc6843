//! System-wide constants for the TANDEM workspace.
//!
//! Single source of truth for numeric limits, register addresses and
//! default paths. Imported by all crates.

use static_assertions::{const_assert, const_assert_eq};

/// Number of physical axes driven by the engine (load + lift).
pub const AXIS_COUNT: usize = 2;

/// Maximum number of waypoints in one motion sequence table.
pub const MAX_WAYPOINTS: usize = 64;

/// Default service name when `[shared] service_name` is omitted.
pub const DEFAULT_SERVICE_NAME: &str = "tandem";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/tandem.toml";

/// Default driver name resolved through the driver registry.
pub const DEFAULT_DRIVER: &str = "simulation";

/// Default bus connect timeout [ms].
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

// ─── Run parameters ─────────────────────────────────────────────────

/// Torque limit used until the operator sends one [mA].
pub const DEFAULT_TORQUE_MA: u32 = 500;

/// Upper clamp for the operator torque limit [mA].
pub const MAX_TORQUE_MA: u32 = 3_000;

/// Sample (cycle) period used until the operator sends one [ms].
pub const DEFAULT_SAMPLE_MS: u32 = 200;

/// Upper clamp for the operator sample period [ms].
pub const MAX_SAMPLE_MS: u32 = 1_000;

/// Default operator gateway listen address.
pub const DEFAULT_GATEWAY_BIND: &str = "0.0.0.0:8080";

// ─── Convergence polling ────────────────────────────────────────────

/// Default bound on mode/status convergence polls (0 = unbounded).
pub const DEFAULT_MAX_POLLS: u32 = 5_000;

/// Default delay between two convergence polls [µs].
pub const DEFAULT_POLL_INTERVAL_US: u64 = 1_000;

// ─── CiA 402 object dictionary ──────────────────────────────────────

/// Position actual value.
pub const OBJ_POSITION_ACTUAL: u16 = 0x6064;

/// Torque actual value (drive reports tens of milliamps).
pub const OBJ_TORQUE_ACTUAL: u16 = 0x6077;

/// Modes of operation display.
pub const OBJ_MODE_DISPLAY: u16 = 0x6061;

/// Scale from raw torque register units to milliamps.
pub const CURRENT_SCALE_MA: i32 = 10;

/// Native drive unit-mode for the torque control loop (`UM=1`).
pub const UM_TORQUE_CONTROL_LOOP: u8 = 1;

/// Native drive unit-mode for the speed control loop (`UM=2`).
pub const UM_SPEED_CONTROL_LOOP: u8 = 2;

/// Native drive unit-mode for the position control loop (`UM=5`).
pub const UM_POSITION_CONTROL_LOOP: u8 = 5;

// ─── Compile-time checks ────────────────────────────────────────────

const_assert!(DEFAULT_TORQUE_MA > 0 && DEFAULT_TORQUE_MA <= MAX_TORQUE_MA);
const_assert!(DEFAULT_SAMPLE_MS > 0 && DEFAULT_SAMPLE_MS <= MAX_SAMPLE_MS);
const_assert!(MAX_WAYPOINTS > 0 && MAX_WAYPOINTS <= 256);
const_assert_eq!(AXIS_COUNT, 2);
