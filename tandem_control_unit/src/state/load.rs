//! Load process: hold the load axis energised while the lift runs.
//!
//! ```text
//! PowerOn → WaitPowerOn → Hold → Release → WaitReleased → PowerOff → Idle
//! ```

use crate::axis::AxisProxy;
use crate::cycle::CycleSnapshot;
use crate::error::ControlError;

use super::process::{MainState, ProcessState, SubState};

pub const PROCESS_NAME: &str = "load";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    PowerOn,
    WaitPowerOn,
    /// Energised until the lift process is back to `Idle`.
    Hold,
    Release,
    WaitReleased,
    PowerOff,
}

impl SubState for LoadStep {
    const FIRST: Self = Self::PowerOn;

    fn name(self) -> &'static str {
        match self {
            Self::PowerOn => "PowerOn",
            Self::WaitPowerOn => "WaitPowerOn",
            Self::Hold => "Hold",
            Self::Release => "Release",
            Self::WaitReleased => "WaitReleased",
            Self::PowerOff => "PowerOff",
        }
    }

    // Hold waits on the lift process, not on the drive.
    fn is_wait(self) -> bool {
        matches!(self, Self::WaitPowerOn | Self::WaitReleased)
    }
}

/// Advance the load process by one transition.
pub fn advance(
    process: &mut ProcessState<LoadStep>,
    snapshot: &CycleSnapshot,
    axis: &mut AxisProxy,
    step_timeout: u32,
) -> Result<(), ControlError> {
    if !process.is_running() {
        return Ok(());
    }
    process.tick(step_timeout, PROCESS_NAME)?;

    let standstill = snapshot.load.status.is_standstill();

    match process.sub() {
        LoadStep::PowerOn => {
            axis.power_on()?;
            process.advance_to(LoadStep::WaitPowerOn);
        }
        LoadStep::WaitPowerOn => {
            if standstill {
                process.advance_to(LoadStep::Hold);
            }
        }
        LoadStep::Hold => {
            if snapshot.lift_main == MainState::Idle {
                process.advance_to(LoadStep::Release);
            }
        }
        LoadStep::Release => {
            axis.stop()?;
            process.advance_to(LoadStep::WaitReleased);
        }
        LoadStep::WaitReleased => {
            if standstill {
                process.advance_to(LoadStep::PowerOff);
            }
        }
        LoadStep::PowerOff => {
            axis.power_off()?;
            process.finish();
        }
    }

    Ok(())
}
