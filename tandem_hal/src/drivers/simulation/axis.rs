//! Simulated drive.
//!
//! A `SimAxis` is the [`AxisDriver`] handed to the control unit. Its state
//! lives behind an `Arc<Mutex<_>>` shared with a [`SimAxisHandle`], through
//! which tests inspect the command trace and inject faults.
//!
//! Power and mode changes complete after a configurable number of status /
//! mode reads, so callers must poll exactly as they would on a real bus.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use tandem_common::consts::{
    CURRENT_SCALE_MA, OBJ_MODE_DISPLAY, OBJ_POSITION_ACTUAL, OBJ_TORQUE_ACTUAL,
};
use tandem_common::drive::driver::{
    AxisDriver, DriveError, ERR_BAD_COMMAND, ERR_ERROR_STOP, ERR_NO_OBJECT, ERR_NOT_POWERED,
    ERR_WRONG_MODE,
};
use tandem_common::drive::event::{DriveEvent, DriveEventHandler, DriveEventKind};
use tandem_common::drive::types::{
    AxisStatus, BufferMode, Direction, MotionDefaults, OperatingMode, Register,
};

use super::clock::SimClock;
use super::physics::AxisKinematics;

/// Longest integration step [s].
const MAX_STEP_S: f64 = 0.001;

/// Drive error code reported for an injected error-stop.
pub const SIM_FAULT_CODE: i32 = 0x5400;

/// Tunables of one simulated drive.
#[derive(Debug, Clone)]
pub struct SimAxisConfig {
    /// Status reads until a power request takes effect.
    pub power_latency_reads: u32,
    /// Mode reads until a mode request takes effect.
    pub mode_latency_reads: u32,
    pub initial_mode: OperatingMode,
    pub initial_position: f64,
    /// Start in error-stop.
    pub start_in_error_stop: bool,
    /// `reset()` does not clear the error-stop.
    pub sticky_error: bool,
    /// Current drawn while energised at rest [mA].
    pub holding_current_ma: f64,
    /// Additional current per count/s of velocity [mA].
    pub current_per_velocity: f64,
}

impl Default for SimAxisConfig {
    fn default() -> Self {
        Self {
            power_latency_reads: 2,
            mode_latency_reads: 3,
            initial_mode: OperatingMode::ProfilePosition,
            initial_position: 0.0,
            start_in_error_stop: false,
            sticky_error: false,
            holding_current_ma: 150.0,
            current_per_velocity: 0.05,
        }
    }
}

/// One command received by a simulated drive, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    SetDefaults,
    PowerOn,
    PowerOff,
    SetMode(OperatingMode),
    MoveAbsolute {
        position: f64,
        velocity: f64,
        buffer: BufferMode,
    },
    MoveVelocity {
        velocity: f64,
        direction: Direction,
    },
    Stop,
    Reset,
    Execute(String),
}

impl SimCommand {
    /// Commands that start or change motion.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::MoveAbsolute { .. } | Self::MoveVelocity { .. } | Self::Stop
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Idle,
    Discrete,
    Continuous(f64),
    Stopping,
}

/// Mutable state of one simulated drive.
struct SimAxisState {
    name: String,
    axis_ref: u16,
    config: SimAxisConfig,
    clock: SimClock,
    last_update: Duration,
    kinematics: AxisKinematics,
    defaults: MotionDefaults,
    powered: bool,
    /// Requested power state and remaining status reads.
    power_request: Option<(bool, u32)>,
    mode: OperatingMode,
    mode_request: Option<(OperatingMode, u32)>,
    error_stop: bool,
    motion: Motion,
    queue: VecDeque<(f64, f64)>,
    done: bool,
    stalled: bool,
    unit_mode: u8,
    torque_limit_ma: Option<u32>,
    fail_next: Option<i32>,
    history: Vec<SimCommand>,
    events: Vec<DriveEvent>,
}

impl SimAxisState {
    fn new(name: &str, axis_ref: u16, config: SimAxisConfig, clock: SimClock) -> Self {
        let defaults = MotionDefaults::default();
        Self {
            name: name.to_string(),
            axis_ref,
            kinematics: AxisKinematics::new(config.initial_position, &defaults),
            last_update: clock.now(),
            clock,
            defaults,
            powered: false,
            power_request: None,
            mode: config.initial_mode,
            mode_request: None,
            error_stop: config.start_in_error_stop,
            motion: Motion::Idle,
            queue: VecDeque::new(),
            done: false,
            stalled: false,
            unit_mode: 0,
            torque_limit_ma: None,
            fail_next: None,
            history: Vec::new(),
            config,
            events: Vec::new(),
        }
    }

    /// Integrate motion up to the current clock time.
    fn advance(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_update).as_secs_f64();
        self.last_update = now;
        if elapsed <= 0.0 || !self.powered || self.error_stop || self.stalled {
            return;
        }

        let mut remaining = elapsed;
        while remaining > 0.0 && self.motion != Motion::Idle {
            let dt = remaining.min(MAX_STEP_S);
            remaining -= dt;
            match self.motion {
                Motion::Discrete => {
                    if self.kinematics.step_to_target(dt) {
                        self.finish_discrete_move();
                    }
                }
                Motion::Continuous(velocity) => self.kinematics.step_velocity(velocity, dt),
                Motion::Stopping => {
                    if self.kinematics.decelerate_to_stop(dt) {
                        self.motion = Motion::Idle;
                        self.done = true;
                    }
                }
                Motion::Idle => {}
            }
        }
    }

    fn finish_discrete_move(&mut self) {
        if let Some((position, velocity)) = self.queue.pop_front() {
            self.kinematics.start_move(position, velocity);
            return;
        }
        self.motion = Motion::Idle;
        self.done = true;
        trace!("{}: move done at {:.3}", self.name, self.kinematics.position());
        self.events.push(DriveEvent::new(
            DriveEventKind::MotionEnded,
            self.axis_ref,
            0,
        ));
    }

    fn status(&self) -> AxisStatus {
        let mut status = if self.error_stop {
            AxisStatus::ERROR_STOP
        } else if !self.powered {
            AxisStatus::DISABLED
        } else {
            match self.motion {
                Motion::Idle => AxisStatus::STAND_STILL,
                Motion::Discrete => AxisStatus::DISCRETE_MOTION,
                Motion::Continuous(_) => AxisStatus::CONTINUOUS_MOTION,
                Motion::Stopping => AxisStatus::STOPPING,
            }
        };
        if self.done {
            status |= AxisStatus::DONE;
        }
        status
    }

    fn error(&self, function: &'static str, code: i32) -> DriveError {
        DriveError::axis(function, &self.name, self.axis_ref, code, self.status())
    }

    /// Consume an injected failure, if any.
    fn check_injected(&mut self, function: &'static str) -> Result<(), DriveError> {
        match self.fail_next.take() {
            Some(code) => Err(self.error(function, code)),
            None => Ok(()),
        }
    }

    fn require_motion_ready(&self, function: &'static str) -> Result<(), DriveError> {
        if self.error_stop {
            return Err(self.error(function, ERR_ERROR_STOP));
        }
        if !self.powered {
            return Err(self.error(function, ERR_NOT_POWERED));
        }
        Ok(())
    }

    fn read_status(&mut self) -> AxisStatus {
        if let Some((target, reads)) = self.power_request {
            if reads == 0 {
                self.apply_power(target);
                self.power_request = None;
            } else {
                self.power_request = Some((target, reads - 1));
            }
        }
        self.advance();
        self.status()
    }

    fn apply_power(&mut self, on: bool) {
        self.powered = on && !self.error_stop;
        if !self.powered {
            self.kinematics.halt();
            self.motion = Motion::Idle;
            self.queue.clear();
        }
        debug!("{}: powered={}", self.name, self.powered);
    }

    fn request_power(&mut self, on: bool) {
        if self.config.power_latency_reads == 0 {
            self.apply_power(on);
            self.power_request = None;
        } else {
            self.power_request = Some((on, self.config.power_latency_reads - 1));
        }
    }

    fn operating_mode(&mut self) -> OperatingMode {
        if let Some((mode, reads)) = self.mode_request {
            if reads == 0 {
                self.mode = mode;
                self.mode_request = None;
            } else {
                self.mode_request = Some((mode, reads - 1));
            }
        }
        self.mode
    }

    fn current_ma(&self) -> f64 {
        if !self.powered {
            return 0.0;
        }
        let current = self.config.holding_current_ma
            + self.kinematics.velocity().abs() * self.config.current_per_velocity;
        match self.torque_limit_ma {
            Some(limit) => current.min(f64::from(limit)),
            None => current,
        }
    }

    fn execute(&mut self, command: &str) -> Result<String, DriveError> {
        let command = command.trim();
        let (key, value) = match command.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (command, None),
        };

        match (key.to_ascii_uppercase().as_str(), value) {
            ("UM", Some(value)) => {
                let mode = value
                    .parse::<u8>()
                    .ok()
                    .filter(|m| (1..=5).contains(m))
                    .ok_or_else(|| self.error("execute", ERR_BAD_COMMAND))?;
                self.unit_mode = mode;
                Ok(String::new())
            }
            ("UM", None) => Ok(self.unit_mode.to_string()),
            ("TC", Some(value)) => {
                let amps = value
                    .parse::<f64>()
                    .ok()
                    .filter(|a| a.is_finite() && *a >= 0.0)
                    .ok_or_else(|| self.error("execute", ERR_BAD_COMMAND))?;
                self.torque_limit_ma = Some((amps * 1000.0).round() as u32);
                Ok(String::new())
            }
            ("TC", None) => Ok(format!(
                "{:.2}",
                f64::from(self.torque_limit_ma.unwrap_or(0)) / 1000.0
            )),
            ("PX", None) => Ok(format!("{}", self.kinematics.position().round() as i64)),
            _ => Err(self.error("execute", ERR_BAD_COMMAND)),
        }
    }
}

/// Simulated drive implementing [`AxisDriver`].
pub struct SimAxis {
    name: String,
    axis_ref: u16,
    state: Arc<Mutex<SimAxisState>>,
    events: Option<Arc<dyn DriveEventHandler>>,
}

impl SimAxis {
    pub(crate) fn new(
        name: &str,
        axis_ref: u16,
        config: SimAxisConfig,
        clock: SimClock,
        events: Option<Arc<dyn DriveEventHandler>>,
    ) -> (Self, SimAxisHandle) {
        let state = Arc::new(Mutex::new(SimAxisState::new(name, axis_ref, config, clock)));
        let handle = SimAxisHandle {
            state: Arc::clone(&state),
            events: events.clone(),
        };
        let axis = Self {
            name: name.to_string(),
            axis_ref,
            state,
            events,
        };
        (axis, handle)
    }

    /// Run `f` under the state lock, then deliver queued events unlocked.
    fn with_state<R>(&self, f: impl FnOnce(&mut SimAxisState) -> R) -> R {
        let (result, events) = {
            let mut state = self.state.lock();
            let result = f(&mut state);
            (result, std::mem::take(&mut state.events))
        };
        dispatch(self.events.as_ref(), &events);
        result
    }
}

fn dispatch(handler: Option<&Arc<dyn DriveEventHandler>>, events: &[DriveEvent]) {
    if let Some(handler) = handler {
        for event in events {
            handler.on_event(event);
        }
    }
}

impl AxisDriver for SimAxis {
    fn name(&self) -> &str {
        &self.name
    }

    fn axis_ref(&self) -> u16 {
        self.axis_ref
    }

    fn set_defaults(&mut self, defaults: &MotionDefaults) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("set_defaults")?;
            s.defaults = *defaults;
            s.kinematics.set_limits(defaults);
            s.history.push(SimCommand::SetDefaults);
            Ok(())
        })
    }

    fn power_on(&mut self, _buffer: BufferMode) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("power_on")?;
            s.history.push(SimCommand::PowerOn);
            if s.error_stop {
                return Err(s.error("power_on", ERR_ERROR_STOP));
            }
            s.request_power(true);
            Ok(())
        })
    }

    fn power_off(&mut self, _buffer: BufferMode) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("power_off")?;
            s.history.push(SimCommand::PowerOff);
            s.request_power(false);
            Ok(())
        })
    }

    fn read_status(&mut self) -> Result<AxisStatus, DriveError> {
        self.with_state(|s| {
            s.check_injected("read_status")?;
            Ok(s.read_status())
        })
    }

    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("set_operating_mode")?;
            s.history.push(SimCommand::SetMode(mode));
            s.done = false;
            if s.mode == mode {
                s.mode_request = None;
            } else if s.config.mode_latency_reads == 0 {
                s.mode = mode;
            } else {
                s.mode_request = Some((mode, s.config.mode_latency_reads - 1));
            }
            Ok(())
        })
    }

    fn operating_mode(&mut self) -> Result<OperatingMode, DriveError> {
        self.with_state(|s| {
            s.check_injected("operating_mode")?;
            Ok(s.operating_mode())
        })
    }

    fn move_absolute(
        &mut self,
        position: f64,
        velocity: f64,
        buffer: BufferMode,
    ) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("move_absolute")?;
            s.advance();
            s.require_motion_ready("move_absolute")?;
            if !s.mode.accepts_position_moves() {
                return Err(s.error("move_absolute", ERR_WRONG_MODE));
            }
            s.history.push(SimCommand::MoveAbsolute {
                position,
                velocity,
                buffer,
            });
            s.done = false;

            let busy = s.motion == Motion::Discrete;
            if busy && buffer != BufferMode::Aborting {
                s.queue.push_back((position, velocity));
            } else {
                s.queue.clear();
                s.kinematics.start_move(position, velocity);
                s.motion = Motion::Discrete;
            }
            Ok(())
        })
    }

    fn move_velocity(&mut self, velocity: f64, direction: Direction) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("move_velocity")?;
            s.advance();
            s.require_motion_ready("move_velocity")?;
            if !s.mode.accepts_velocity_moves() {
                return Err(s.error("move_velocity", ERR_WRONG_MODE));
            }
            s.history.push(SimCommand::MoveVelocity {
                velocity,
                direction,
            });
            s.done = false;
            s.queue.clear();
            s.motion = Motion::Continuous(velocity.abs() * direction.sign());
            Ok(())
        })
    }

    fn stop(&mut self) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("stop")?;
            s.advance();
            s.history.push(SimCommand::Stop);
            if s.error_stop || !s.powered {
                return Ok(());
            }
            s.queue.clear();
            if s.motion != Motion::Idle {
                s.motion = Motion::Stopping;
            }
            Ok(())
        })
    }

    fn reset(&mut self) -> Result<(), DriveError> {
        self.with_state(|s| {
            s.check_injected("reset")?;
            s.history.push(SimCommand::Reset);
            if s.error_stop && !s.config.sticky_error {
                s.error_stop = false;
                s.done = false;
                debug!("{}: error-stop cleared", s.name);
            }
            Ok(())
        })
    }

    fn upload_register(&mut self, register: Register) -> Result<i32, DriveError> {
        self.with_state(|s| {
            s.check_injected("upload_register")?;
            s.advance();
            match (register.object_id, register.subindex) {
                (OBJ_TORQUE_ACTUAL, 0) => {
                    Ok((s.current_ma() / f64::from(CURRENT_SCALE_MA)).round() as i32)
                }
                (OBJ_POSITION_ACTUAL, 0) => Ok(s.kinematics.position().round() as i32),
                (OBJ_MODE_DISPLAY, 0) => Ok(i32::from(s.mode as u8)),
                _ => Err(s.error("upload_register", ERR_NO_OBJECT)),
            }
        })
    }

    fn execute(&mut self, command: &str) -> Result<String, DriveError> {
        self.with_state(|s| {
            s.check_injected("execute")?;
            s.history.push(SimCommand::Execute(command.to_string()));
            s.execute(command)
        })
    }

    fn actual_position(&mut self) -> Result<f64, DriveError> {
        self.with_state(|s| {
            s.check_injected("actual_position")?;
            s.advance();
            Ok(s.kinematics.position())
        })
    }
}

/// Test/inspection handle on a simulated drive.
#[derive(Clone)]
pub struct SimAxisHandle {
    state: Arc<Mutex<SimAxisState>>,
    events: Option<Arc<dyn DriveEventHandler>>,
}

impl SimAxisHandle {
    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    /// Every command received so far.
    pub fn history(&self) -> Vec<SimCommand> {
        self.state.lock().history.clone()
    }

    /// `(position, velocity)` of every accepted `move_absolute`, in order.
    pub fn moves(&self) -> Vec<(f64, f64)> {
        self.state
            .lock()
            .history
            .iter()
            .filter_map(|c| match c {
                SimCommand::MoveAbsolute {
                    position, velocity, ..
                } => Some((*position, *velocity)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_history(&self) {
        self.state.lock().history.clear();
    }

    /// Status without consuming latency reads.
    pub fn peek_status(&self) -> AxisStatus {
        let mut state = self.state.lock();
        state.advance();
        state.status()
    }

    pub fn position(&self) -> f64 {
        self.state.lock().kinematics.position()
    }

    pub fn mode(&self) -> OperatingMode {
        self.state.lock().mode
    }

    pub fn unit_mode(&self) -> u8 {
        self.state.lock().unit_mode
    }

    pub fn torque_limit_ma(&self) -> Option<u32> {
        self.state.lock().torque_limit_ma
    }

    /// Force the drive into error-stop and raise a `DriveError` event.
    ///
    /// With `sticky`, a later `reset()` leaves the error-stop in place.
    pub fn inject_error_stop(&self, sticky: bool) {
        let event = {
            let mut state = self.state.lock();
            state.advance();
            warn!("{}: injected error-stop (sticky={sticky})", state.name);
            state.error_stop = true;
            state.config.sticky_error = sticky;
            state.kinematics.halt();
            state.motion = Motion::Idle;
            state.queue.clear();
            DriveEvent::new(DriveEventKind::DriveError, state.axis_ref, SIM_FAULT_CODE)
        };
        dispatch(self.events.as_ref(), &[event]);
    }

    /// Make the next driver call fail with `code`.
    pub fn fail_next_call(&self, code: i32) {
        self.state.lock().fail_next = Some(code);
    }

    /// Freeze (or release) all motion progress.
    pub fn set_stalled(&self, stalled: bool) {
        let mut state = self.state.lock();
        state.advance();
        state.stalled = stalled;
    }
}
