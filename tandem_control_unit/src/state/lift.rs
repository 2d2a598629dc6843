//! Lift process: power up, walk the waypoint table, stop, power down.
//!
//! ```text
//! PowerOn → WaitPowerOn → IssueMove ⇄ WaitMoveDone → Finish → WaitFinalMoveDone → PowerOff → Idle
//! ```
//!
//! Every decision reads `snapshot.lift`; commands go to the lift axis only.

use tracing::debug;

use crate::axis::AxisProxy;
use crate::cycle::CycleSnapshot;
use crate::error::ControlError;
use crate::sequence::MotionSequence;

use super::process::{ProcessState, SubState};

pub const PROCESS_NAME: &str = "lift";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftStep {
    PowerOn,
    WaitPowerOn,
    IssueMove,
    /// Waiting for waypoint `index` to complete.
    WaitMoveDone { index: usize },
    Finish,
    WaitFinalMoveDone,
    PowerOff,
}

impl SubState for LiftStep {
    const FIRST: Self = Self::PowerOn;

    fn name(self) -> &'static str {
        match self {
            Self::PowerOn => "PowerOn",
            Self::WaitPowerOn => "WaitPowerOn",
            Self::IssueMove => "IssueMove",
            Self::WaitMoveDone { .. } => "WaitMoveDone",
            Self::Finish => "Finish",
            Self::WaitFinalMoveDone => "WaitFinalMoveDone",
            Self::PowerOff => "PowerOff",
        }
    }

    fn is_wait(self) -> bool {
        matches!(
            self,
            Self::WaitPowerOn | Self::WaitMoveDone { .. } | Self::WaitFinalMoveDone
        )
    }
}

/// Advance the lift process by one transition.
///
/// Returns the index of the waypoint issued in this cycle, if any.
pub fn advance(
    process: &mut ProcessState<LiftStep>,
    snapshot: &CycleSnapshot,
    axis: &mut AxisProxy,
    table: &mut MotionSequence,
    step_timeout: u32,
) -> Result<Option<usize>, ControlError> {
    if !process.is_running() {
        return Ok(None);
    }
    process.tick(step_timeout, PROCESS_NAME)?;

    let standstill = snapshot.lift.status.is_standstill();
    let mut issued = None;

    match process.sub() {
        LiftStep::PowerOn => {
            axis.power_on()?;
            process.advance_to(LiftStep::WaitPowerOn);
        }
        LiftStep::WaitPowerOn => {
            if standstill {
                process.advance_to(LiftStep::IssueMove);
            }
        }
        LiftStep::IssueMove => match table.next() {
            Some((index, waypoint)) => {
                axis.move_absolute(&waypoint)?;
                debug!(
                    "lift: waypoint {index} -> {} @ {}",
                    waypoint.position, waypoint.velocity
                );
                issued = Some(index);
                process.advance_to(LiftStep::WaitMoveDone { index });
            }
            None => process.advance_to(LiftStep::Finish),
        },
        LiftStep::WaitMoveDone { .. } => {
            if standstill {
                let next = if table.has_more() {
                    LiftStep::IssueMove
                } else {
                    LiftStep::Finish
                };
                process.advance_to(next);
            }
        }
        LiftStep::Finish => {
            axis.stop()?;
            process.advance_to(LiftStep::WaitFinalMoveDone);
        }
        LiftStep::WaitFinalMoveDone => {
            if standstill {
                process.advance_to(LiftStep::PowerOff);
            }
        }
        LiftStep::PowerOff => {
            axis.power_off()?;
            process.finish();
        }
    }

    Ok(issued)
}
