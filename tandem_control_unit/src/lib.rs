//! # TANDEM Control Unit Library
//!
//! Motion sequencing engine for a two-axis rig (load + lift) on a cyclic
//! field bus. Each cycle captures one consistent snapshot of both drives,
//! advances two process state machines from it, and streams a telemetry
//! record to the operator client.
//!
//! ## Layers
//!
//! 1. **Axis proxy** ([`axis`]): sole owner of a drive; mode bookkeeping,
//!    bounded convergence polls, register scaling.
//! 2. **Sequence** ([`sequence`]): fixed-capacity waypoint table.
//! 3. **Processes** ([`state`]): lift and load sub-state machines.
//! 4. **Cycle** ([`cycle`]): re-entrancy guard, snapshot, scheduler.
//! 5. **Safety** ([`safety`]): termination latch, drive events, shutdown.
//! 6. **Gateway** ([`gateway`], [`telemetry`]): operator TCP edge.
//!
//! [`session`] ties them together; every fatal error ends in one
//! safe-shutdown path there.

pub mod axis;
pub mod config;
pub mod cycle;
pub mod error;
pub mod gateway;
pub mod safety;
pub mod sequence;
pub mod session;
pub mod state;
pub mod telemetry;
