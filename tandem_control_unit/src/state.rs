//! Process state machines.
//!
//! Two processes advance once per cycle from the same [`CycleSnapshot`]:
//! the lift process walks the waypoint table, the load process keeps the
//! load axis energised until the lift has finished.
//!
//! [`CycleSnapshot`]: crate::cycle::CycleSnapshot

pub mod lift;
pub mod load;
pub mod process;

pub use lift::LiftStep;
pub use load::LoadStep;
pub use process::{MainState, ProcessState, SubState};

#[cfg(test)]
pub(crate) mod testing;
