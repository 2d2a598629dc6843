//! Field-bus driver boundary.
//!
//! Everything the motion engine knows about the physical drives goes
//! through the traits in [`driver`]. Status bits, operating modes and
//! register addresses live in [`types`]; asynchronous bus events in
//! [`event`].

pub mod driver;
pub mod event;
pub mod types;
