//! Driver registry for field-bus drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving bus
//! factories by name. This uses constructor-injection rather than global state.

use std::collections::HashMap;
use tandem_common::drive::driver::{BusFactory, DriveError, FieldBus};

/// Registry of available field-bus drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BusFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin() -> Result<Self, DriveError> {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry)?;
        Ok(registry)
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// Returns `DriveError::Other` if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) -> Result<(), DriveError> {
        if self.factories.contains_key(name) {
            return Err(DriveError::Other(format!(
                "Driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Create a bus instance by name.
    ///
    /// # Errors
    /// Returns `DriveError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn FieldBus>, DriveError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DriveError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
