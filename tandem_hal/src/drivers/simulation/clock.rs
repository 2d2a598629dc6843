//! Time source for the simulation.
//!
//! The real-time clock follows `Instant`; the manual clock only moves when
//! a test calls [`SimClock::advance`], which makes kinematics deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic simulation clock. Cloning shares the same time base.
#[derive(Debug, Clone)]
pub enum SimClock {
    Realtime(Instant),
    Manual(Arc<AtomicU64>),
}

impl SimClock {
    /// Clock following wall time from now on.
    pub fn realtime() -> Self {
        Self::Realtime(Instant::now())
    }

    /// Clock frozen at zero until advanced.
    pub fn manual() -> Self {
        Self::Manual(Arc::new(AtomicU64::new(0)))
    }

    /// Time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        match self {
            Self::Realtime(start) => start.elapsed(),
            Self::Manual(nanos) => Duration::from_nanos(nanos.load(Ordering::Acquire)),
        }
    }

    /// Move a manual clock forward. No effect on a real-time clock.
    pub fn advance(&self, by: Duration) {
        if let Self::Manual(nanos) = self {
            let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
            nanos.fetch_add(by, Ordering::AcqRel);
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::realtime()
    }
}
