//! Recording driver for process unit tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tandem_common::drive::driver::{AxisDriver, DriveError};
use tandem_common::drive::types::{
    AxisStatus, BufferMode, Direction, MotionDefaults, OperatingMode, Register,
};

use crate::axis::{AxisProxy, PollPolicy};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PowerOn,
    PowerOff,
    Move(f64, f64),
    Stop,
}

/// Accepts every command, reports a fixed status.
pub struct Recorder {
    name: String,
    mode: OperatingMode,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl AxisDriver for Recorder {
    fn name(&self) -> &str {
        &self.name
    }
    fn axis_ref(&self) -> u16 {
        0
    }
    fn set_defaults(&mut self, _defaults: &MotionDefaults) -> Result<(), DriveError> {
        Ok(())
    }
    fn power_on(&mut self, _buffer: BufferMode) -> Result<(), DriveError> {
        self.calls.lock().push(Call::PowerOn);
        Ok(())
    }
    fn power_off(&mut self, _buffer: BufferMode) -> Result<(), DriveError> {
        self.calls.lock().push(Call::PowerOff);
        Ok(())
    }
    fn read_status(&mut self) -> Result<AxisStatus, DriveError> {
        Ok(AxisStatus::STAND_STILL)
    }
    fn set_operating_mode(&mut self, mode: OperatingMode) -> Result<(), DriveError> {
        self.mode = mode;
        Ok(())
    }
    fn operating_mode(&mut self) -> Result<OperatingMode, DriveError> {
        Ok(self.mode)
    }
    fn move_absolute(&mut self, position: f64, velocity: f64, _buffer: BufferMode) -> Result<(), DriveError> {
        self.calls.lock().push(Call::Move(position, velocity));
        Ok(())
    }
    fn move_velocity(&mut self, _velocity: f64, _direction: Direction) -> Result<(), DriveError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), DriveError> {
        self.calls.lock().push(Call::Stop);
        Ok(())
    }
    fn reset(&mut self) -> Result<(), DriveError> {
        Ok(())
    }
    fn upload_register(&mut self, _register: Register) -> Result<i32, DriveError> {
        Ok(0)
    }
    fn execute(&mut self, _command: &str) -> Result<String, DriveError> {
        Ok(String::new())
    }
    fn actual_position(&mut self) -> Result<f64, DriveError> {
        Ok(0.0)
    }
}

/// Proxy in confirmed `ProfilePosition` plus its call log.
pub fn recorded_axis(name: &str) -> (AxisProxy, Arc<Mutex<Vec<Call>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let driver = Recorder {
        name: name.to_string(),
        mode: OperatingMode::ProfilePosition,
        calls: Arc::clone(&calls),
    };
    let mut axis = AxisProxy::new(Box::new(driver), PollPolicy::new(1, Duration::ZERO));
    axis.switch_mode(OperatingMode::ProfilePosition)
        .expect("recorder accepts every mode");
    (axis, calls)
}
