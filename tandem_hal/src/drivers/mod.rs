//! Field-bus driver implementations.
//!
//! - [`simulation`] - Software bus for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `FieldBus` and `AxisDriver` from `tandem_common::drive::driver`
//! 3. Register the factory in [`register_all_drivers`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use tandem_common::drive::driver::DriveError;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), DriveError> {
    registry.register("simulation", simulation::create_driver)?;
    Ok(())
}
