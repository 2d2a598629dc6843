//! # TANDEM HAL Library
//!
//! Field-bus drivers behind the `FieldBus` / `AxisDriver` traits defined in
//! `tandem_common::drive::driver`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   create_driver(name)   ┌────────────────────┐
//! │  Control Unit     │ ──────────────────────► │  DriverRegistry    │
//! └────────┬──────────┘                         └─────────┬──────────┘
//!          │ Box<dyn FieldBus>                            │ BusFactory
//!          ▼                                              ▼
//! ┌───────────────────┐   init_axis(name)       ┌────────────────────┐
//! │  FieldBus         │ ──────────────────────► │  Box<dyn AxisDriver>│
//! └───────────────────┘                         └────────────────────┘
//! ```

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimBus, SimClock, SimProbe};
