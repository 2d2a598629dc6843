//! Safety module root.
//!
//! Termination latch and signal handlers, drive-event monitoring, and the
//! safe-shutdown sequence run on every exit path.

pub mod events;
pub mod shutdown;
pub mod termination;

pub use events::EventMonitor;
pub use shutdown::{ShutdownReport, abort_startup, safe_shutdown};
pub use termination::{TerminationLatch, TerminationReason, install_signal_handlers};
