//! Control-unit configuration.
//!
//! One TOML file, loaded through [`ConfigLoader`] and validated by
//! [`TandemConfig::validate`]. Every field has a default, so an empty file
//! describes the reference rig.
//!
//! ```toml
//! [bus]
//! driver = "simulation"
//!
//! [axes.lift]
//! name = "lift"
//! operating_mode = "profile_position"
//!
//! [[sequence.waypoints]]
//! position = 4000.0
//! velocity = 2000.0
//!
//! [cycle]
//! cadence = "timer"
//! max_polls = 5000
//!
//! [gateway]
//! bind = "0.0.0.0:8080"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use tandem_common::config::{ConfigError, ConfigLoader, SharedConfig};
use tandem_common::consts::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DRIVER, DEFAULT_GATEWAY_BIND, DEFAULT_MAX_POLLS,
    DEFAULT_POLL_INTERVAL_US, DEFAULT_SAMPLE_MS, DEFAULT_TORQUE_MA, MAX_SAMPLE_MS, MAX_TORQUE_MA,
    MAX_WAYPOINTS,
};
use tandem_common::drive::types::{BufferMode, BusKind, MotionDefaults, OperatingMode};

// ─── Sections ───────────────────────────────────────────────────────

/// Root of `tandem.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TandemConfig {
    pub shared: SharedConfig,
    pub bus: BusConfig,
    pub axes: AxesConfig,
    pub sequence: SequenceConfig,
    pub cycle: CycleConfig,
    pub gateway: GatewayConfig,
}

/// `[bus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Registered driver name.
    pub driver: String,
    pub connect_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl BusConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// `[axes.load]` / `[axes.lift]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Logical name passed to the bus at init.
    pub name: String,
    /// Mode commanded at startup; bus default when absent.
    #[serde(default)]
    pub operating_mode: Option<OperatingMode>,
    #[serde(default)]
    pub motion: MotionDefaults,
}

impl AxisConfig {
    /// Reference load axis: faster default profile.
    pub fn load_default() -> Self {
        Self {
            name: "load".to_string(),
            operating_mode: None,
            motion: MotionDefaults {
                velocity: 640_000.0,
                acceleration: 960_000.0,
                deceleration: 960_000.0,
                ..MotionDefaults::default()
            },
        }
    }

    pub fn lift_default() -> Self {
        Self {
            name: "lift".to_string(),
            operating_mode: None,
            motion: MotionDefaults::default(),
        }
    }

    /// Mode to command on a bus of the given kind.
    pub fn mode_for(&self, bus: BusKind) -> OperatingMode {
        self.operating_mode
            .unwrap_or_else(|| OperatingMode::default_for(bus))
    }
}

/// `[axes]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxesConfig {
    #[serde(default = "AxisConfig::load_default")]
    pub load: AxisConfig,
    #[serde(default = "AxisConfig::lift_default")]
    pub lift: AxisConfig,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            load: AxisConfig::load_default(),
            lift: AxisConfig::lift_default(),
        }
    }
}

/// One `[[sequence.waypoints]]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaypointConfig {
    pub position: f64,
    pub velocity: f64,
    #[serde(default)]
    pub buffer_mode: BufferMode,
}

/// `[sequence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequenceConfig {
    pub waypoints: Vec<WaypointConfig>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        let wp = |position, velocity| WaypointConfig {
            position,
            velocity,
            buffer_mode: BufferMode::Buffered,
        };
        Self {
            waypoints: vec![wp(4000.0, 2000.0), wp(0.0, 4000.0), wp(8000.0, 8000.0)],
        }
    }
}

/// Cycle timing discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Dedicated thread woken at absolute deadlines.
    #[default]
    Timer,
    /// Run a cycle, then sleep one period.
    Polling,
}

/// `[cycle]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    pub cadence: Cadence,
    /// Bound on convergence polls (0 = unbounded).
    pub max_polls: u32,
    pub poll_interval_us: u64,
    /// Cycles a process may wait in one sub-state (0 = no limit).
    pub step_timeout_cycles: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cadence: Cadence::Timer,
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            step_timeout_cycles: 0,
        }
    }
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub bind: String,
    pub max_torque_ma: u32,
    pub max_sample_ms: u32,
    pub default_torque_ma: u32,
    pub default_sample_ms: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_GATEWAY_BIND.to_string(),
            max_torque_ma: MAX_TORQUE_MA,
            max_sample_ms: MAX_SAMPLE_MS,
            default_torque_ma: DEFAULT_TORQUE_MA,
            default_sample_ms: DEFAULT_SAMPLE_MS,
        }
    }
}

// ─── Loading & validation ───────────────────────────────────────────

/// Load and validate `path`.
pub fn load_config(path: &Path) -> Result<TandemConfig, ConfigError> {
    let config = TandemConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

fn check_motion(axis: &str, motion: &MotionDefaults) -> Result<(), ConfigError> {
    for (field, value) in [
        ("velocity", motion.velocity),
        ("acceleration", motion.acceleration),
        ("deceleration", motion.deceleration),
        ("jerk", motion.jerk),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(format!(
                "axes.{axis}.motion.{field} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}

impl TandemConfig {
    /// Check bounds and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.bus.driver.is_empty() {
            return Err(invalid("bus.driver cannot be empty"));
        }
        if self.bus.connect_timeout_ms == 0 {
            return Err(invalid("bus.connect_timeout_ms must be > 0"));
        }

        for (key, axis) in [("load", &self.axes.load), ("lift", &self.axes.lift)] {
            if axis.name.is_empty() {
                return Err(invalid(format!("axes.{key}.name cannot be empty")));
            }
            check_motion(key, &axis.motion)?;
        }
        if self.axes.load.name == self.axes.lift.name {
            return Err(invalid(format!(
                "axes.load and axes.lift share the name '{}'",
                self.axes.load.name
            )));
        }

        let waypoints = &self.sequence.waypoints;
        if waypoints.is_empty() {
            return Err(invalid("sequence.waypoints cannot be empty"));
        }
        if waypoints.len() > MAX_WAYPOINTS {
            return Err(invalid(format!(
                "sequence.waypoints has {} entries, max {MAX_WAYPOINTS}",
                waypoints.len()
            )));
        }
        for (i, wp) in waypoints.iter().enumerate() {
            if !wp.position.is_finite() {
                return Err(invalid(format!("sequence.waypoints[{i}].position not finite")));
            }
            if !wp.velocity.is_finite() || wp.velocity <= 0.0 {
                return Err(invalid(format!(
                    "sequence.waypoints[{i}].velocity must be positive, got {}",
                    wp.velocity
                )));
            }
        }

        if self.cycle.poll_interval_us == 0 {
            return Err(invalid("cycle.poll_interval_us must be > 0"));
        }

        let gw = &self.gateway;
        if gw.bind.is_empty() {
            return Err(invalid("gateway.bind cannot be empty"));
        }
        if !(1..=MAX_TORQUE_MA).contains(&gw.max_torque_ma) {
            return Err(invalid(format!(
                "gateway.max_torque_ma must be in 1..={MAX_TORQUE_MA}, got {}",
                gw.max_torque_ma
            )));
        }
        if !(1..=MAX_SAMPLE_MS).contains(&gw.max_sample_ms) {
            return Err(invalid(format!(
                "gateway.max_sample_ms must be in 1..={MAX_SAMPLE_MS}, got {}",
                gw.max_sample_ms
            )));
        }
        if !(1..=gw.max_torque_ma).contains(&gw.default_torque_ma) {
            return Err(invalid(format!(
                "gateway.default_torque_ma must be in 1..={}, got {}",
                gw.max_torque_ma, gw.default_torque_ma
            )));
        }
        if !(1..=gw.max_sample_ms).contains(&gw.default_sample_ms) {
            return Err(invalid(format!(
                "gateway.default_sample_ms must be in 1..={}, got {}",
                gw.max_sample_ms, gw.default_sample_ms
            )));
        }

        Ok(())
    }
}
