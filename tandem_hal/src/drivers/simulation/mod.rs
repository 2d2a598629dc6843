//! Simulation driver module.
//!
//! This module provides a software field bus for development and testing
//! without physical hardware.

mod axis;
mod bus;
mod clock;
mod physics;

pub use axis::{SIM_FAULT_CODE, SimAxis, SimAxisConfig, SimAxisHandle, SimCommand};
pub use bus::{SimBus, SimProbe};
pub use clock::SimClock;
pub use physics::AxisKinematics;

use tandem_common::drive::driver::FieldBus;

/// Factory function to create a simulation bus instance.
pub fn create_driver() -> Box<dyn FieldBus> {
    Box::new(SimBus::new())
}
