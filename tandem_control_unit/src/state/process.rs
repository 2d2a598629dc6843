//! Main-state / sub-state bookkeeping shared by both processes.
//!
//! A process is `Idle` or `Running`. Requests from outside the cycle are
//! latched and applied in [`ProcessState::sync`] (cycle step 4), which is
//! also the only place where a main-state change resets the sub-state.

use std::fmt::Debug;

use crate::error::ControlError;

/// Top-level state of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MainState {
    #[default]
    Idle = 0,
    Running = 1,
}

impl MainState {
    #[inline]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Idle),
            1 => Some(Self::Running),
            _ => None,
        }
    }
}

/// Per-process sub-state vocabulary.
pub trait SubState: Copy + PartialEq + Debug {
    /// Sub-state entered on every main-state change.
    const FIRST: Self;

    fn name(self) -> &'static str;

    /// Sub-states that only wait on the drive; subject to the step watchdog.
    fn is_wait(self) -> bool;
}

/// `{main, previous main, sub}` of one process.
#[derive(Debug, Clone)]
pub struct ProcessState<S: SubState> {
    main: MainState,
    previous: MainState,
    sub: S,
    request: Option<MainState>,
    step_cycles: u32,
}

impl<S: SubState> Default for ProcessState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SubState> ProcessState<S> {
    pub const fn new() -> Self {
        Self {
            main: MainState::Idle,
            previous: MainState::Idle,
            sub: S::FIRST,
            request: None,
            step_cycles: 0,
        }
    }

    #[inline]
    pub fn main(&self) -> MainState {
        self.main
    }

    #[inline]
    pub fn sub(&self) -> S {
        self.sub
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.main == MainState::Running
    }

    /// Idle with no pending request.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.main == MainState::Idle && self.request.is_none_or(|r| r == MainState::Idle)
    }

    /// Cycles spent in the current sub-state.
    #[inline]
    pub fn step_cycles(&self) -> u32 {
        self.step_cycles
    }

    /// Latch a main-state change for the next `sync()`.
    pub fn request(&mut self, main: MainState) {
        self.request = Some(main);
    }

    /// Apply a pending request and detect main-state transitions.
    ///
    /// Returns `true` when the sub-state was reset to [`SubState::FIRST`].
    pub fn sync(&mut self) -> bool {
        if let Some(main) = self.request.take() {
            self.main = main;
        }
        let changed = self.main != self.previous;
        if changed {
            self.sub = S::FIRST;
            self.step_cycles = 0;
        }
        self.previous = self.main;
        changed
    }

    pub fn advance_to(&mut self, sub: S) {
        self.sub = sub;
        self.step_cycles = 0;
    }

    /// End of the sub-state chain; the sub-state resets on the next sync.
    pub fn finish(&mut self) {
        self.main = MainState::Idle;
    }

    /// Count one cycle in the current sub-state and enforce `limit` (0 = off).
    pub fn tick(&mut self, limit: u32, process: &'static str) -> Result<(), ControlError> {
        self.step_cycles = self.step_cycles.saturating_add(1);
        if limit > 0 && self.sub.is_wait() && self.step_cycles > limit {
            return Err(ControlError::StepTimeout {
                process,
                step: self.sub.name(),
                cycles: self.step_cycles,
            });
        }
        Ok(())
    }
}
