//! Axis proxy: the only owner of an [`AxisDriver`].
//!
//! Wraps one physical axis with the bookkeeping the drive itself does not
//! provide: the commanded vs. confirmed operating mode, bounded
//! convergence polling, the single startup reset and register scaling.
//!
//! Power and mode requests return immediately. Callers that need the new
//! state either poll through [`AxisProxy::wait_until`] / [`AxisProxy::wait_for_mode`]
//! (initialisation, shutdown) or observe it in the next cycle snapshot.

use std::time::Duration;
use tracing::{debug, info, warn};

use tandem_common::consts::CURRENT_SCALE_MA;
use tandem_common::drive::driver::{AxisDriver, DriveError};
use tandem_common::drive::types::{
    AxisStatus, Direction, MotionDefaults, OperatingMode, Register,
};

use crate::config::CycleConfig;
use crate::error::ControlError;
use crate::sequence::Waypoint;

// ─── Poll policy ────────────────────────────────────────────────────

/// Bound for convergence loops (mode switch, power state, done bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probes (0 = unbounded).
    pub max_polls: u32,
    /// Delay between two probes.
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_polls: u32, interval: Duration) -> Self {
        Self {
            max_polls,
            interval,
        }
    }

    pub fn from_config(config: &CycleConfig) -> Self {
        Self::new(
            config.max_polls,
            Duration::from_micros(config.poll_interval_us),
        )
    }

    #[inline]
    pub const fn is_unbounded(&self) -> bool {
        self.max_polls == 0
    }

    /// Call `probe` until it yields a value or the bound is exhausted.
    ///
    /// Sleeps `interval` between probes, never after the last one.
    pub fn poll<T>(
        &self,
        axis: &str,
        what: &'static str,
        mut probe: impl FnMut() -> Result<Option<T>, DriveError>,
    ) -> Result<T, ControlError> {
        let mut polls: u32 = 0;
        loop {
            if let Some(value) = probe()? {
                return Ok(value);
            }
            polls = polls.saturating_add(1);
            if !self.is_unbounded() && polls >= self.max_polls {
                return Err(ControlError::ConvergenceTimeout {
                    axis: axis.to_string(),
                    what,
                    polls,
                });
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }
    }
}

// ─── Proxy ──────────────────────────────────────────────────────────

/// One physical axis as seen by the engine.
pub struct AxisProxy {
    driver: Box<dyn AxisDriver>,
    defaults: MotionDefaults,
    commanded_mode: Option<OperatingMode>,
    confirmed_mode: Option<OperatingMode>,
    policy: PollPolicy,
}

impl AxisProxy {
    pub fn new(driver: Box<dyn AxisDriver>, policy: PollPolicy) -> Self {
        Self {
            driver,
            defaults: MotionDefaults::default(),
            commanded_mode: None,
            confirmed_mode: None,
            policy,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.driver.name()
    }

    #[inline]
    pub fn axis_ref(&self) -> u16 {
        self.driver.axis_ref()
    }

    #[inline]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Mode last confirmed by the drive, if any.
    #[inline]
    pub fn confirmed_mode(&self) -> Option<OperatingMode> {
        self.confirmed_mode
    }

    pub fn apply_defaults(&mut self, defaults: &MotionDefaults) -> Result<(), ControlError> {
        self.driver.set_defaults(defaults)?;
        self.defaults = *defaults;
        debug!("{}: motion defaults {:?}", self.name(), defaults);
        Ok(())
    }

    // ── Power ──

    pub fn power_on(&mut self) -> Result<(), ControlError> {
        self.driver.power_on(self.defaults.buffer_mode)?;
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<(), ControlError> {
        self.driver.power_off(self.defaults.buffer_mode)?;
        Ok(())
    }

    // ── Status ──

    pub fn read_status(&mut self) -> Result<AxisStatus, ControlError> {
        Ok(self.driver.read_status()?)
    }

    /// Poll status until `pred` holds.
    pub fn wait_until(
        &mut self,
        what: &'static str,
        pred: impl Fn(AxisStatus) -> bool,
    ) -> Result<AxisStatus, ControlError> {
        let policy = self.policy;
        let name = self.driver.name().to_string();
        let driver = &mut self.driver;
        policy.poll(&name, what, || {
            let status = driver.read_status()?;
            Ok(pred(status).then_some(status))
        })
    }

    /// Wait until the `DONE` bit of the last command clears.
    pub fn wait_done_cleared(&mut self) -> Result<AxisStatus, ControlError> {
        self.wait_until("DONE cleared", |s| !s.contains(AxisStatus::DONE))
    }

    pub fn wait_disabled(&mut self) -> Result<AxisStatus, ControlError> {
        self.wait_until("DISABLED", AxisStatus::is_disabled)
    }

    /// Startup error-stop recovery: at most one `reset()`.
    ///
    /// # Errors
    /// [`ControlError::PersistentErrorStop`] if the error-stop survives the reset.
    pub fn recover_error_stop(&mut self) -> Result<AxisStatus, ControlError> {
        let status = self.read_status()?;
        if !status.is_error_stop() {
            return Ok(status);
        }

        warn!("{}: in Error Stop (status={:#06x}), resetting", self.name(), status.bits());
        self.driver.reset()?;
        let status = self.read_status()?;
        if status.is_error_stop() {
            return Err(ControlError::PersistentErrorStop {
                axis: self.name().to_string(),
                status: status.bits(),
            });
        }
        info!("{}: Error Stop cleared", self.name());
        Ok(status)
    }

    pub fn reset(&mut self) -> Result<(), ControlError> {
        self.driver.reset()?;
        Ok(())
    }

    // ── Operating mode ──

    /// Request a mode. Motion for that mode is refused until confirmed.
    pub fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<(), ControlError> {
        self.driver.set_operating_mode(mode)?;
        self.commanded_mode = Some(mode);
        self.confirmed_mode = None;
        Ok(())
    }

    pub fn operating_mode(&mut self) -> Result<OperatingMode, ControlError> {
        Ok(self.driver.operating_mode()?)
    }

    /// Poll the drive until it reports `mode`, then mark it confirmed.
    pub fn wait_for_mode(&mut self, mode: OperatingMode) -> Result<(), ControlError> {
        let policy = self.policy;
        let name = self.driver.name().to_string();
        let driver = &mut self.driver;
        policy.poll(&name, "operating mode", || {
            Ok((driver.operating_mode()? == mode).then_some(()))
        })?;
        self.confirmed_mode = Some(mode);
        debug!("{name}: mode {mode:?} confirmed");
        Ok(())
    }

    /// Request `mode` and wait for it.
    pub fn switch_mode(&mut self, mode: OperatingMode) -> Result<(), ControlError> {
        self.set_operating_mode(mode)?;
        self.wait_for_mode(mode)
    }

    // ── Motion ──

    fn require_mode(
        &self,
        expected: &'static str,
        accepts: fn(OperatingMode) -> bool,
    ) -> Result<(), ControlError> {
        match self.confirmed_mode {
            Some(mode) if accepts(mode) && self.commanded_mode == Some(mode) => Ok(()),
            actual => Err(ControlError::ModeMismatch {
                axis: self.name().to_string(),
                expected,
                actual,
            }),
        }
    }

    /// Issue one waypoint as an absolute move.
    pub fn move_absolute(&mut self, waypoint: &Waypoint) -> Result<(), ControlError> {
        self.require_mode("position", OperatingMode::accepts_position_moves)?;
        self.driver
            .move_absolute(waypoint.position, waypoint.velocity, waypoint.buffer)?;
        Ok(())
    }

    pub fn move_velocity(&mut self, velocity: f64, direction: Direction) -> Result<(), ControlError> {
        self.require_mode("velocity", OperatingMode::accepts_velocity_moves)?;
        self.driver.move_velocity(velocity, direction)?;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ControlError> {
        self.driver.stop()?;
        Ok(())
    }

    // ── Registers & native commands ──

    /// Actual motor current [mA].
    pub fn read_current_ma(&mut self) -> Result<i32, ControlError> {
        let raw = self.driver.upload_register(Register::TORQUE_ACTUAL)?;
        Ok(raw.saturating_mul(CURRENT_SCALE_MA))
    }

    /// Position actual value register [counts].
    pub fn read_position_register(&mut self) -> Result<i32, ControlError> {
        Ok(self.driver.upload_register(Register::POSITION_ACTUAL)?)
    }

    pub fn upload_register(&mut self, register: Register) -> Result<i32, ControlError> {
        Ok(self.driver.upload_register(register)?)
    }

    pub fn execute(&mut self, command: &str) -> Result<String, ControlError> {
        let reply = self.driver.execute(command)?;
        debug!("{}: {command} -> {reply:?}", self.name());
        Ok(reply)
    }

    pub fn actual_position(&mut self) -> Result<f64, ControlError> {
        Ok(self.driver.actual_position()?)
    }
}
