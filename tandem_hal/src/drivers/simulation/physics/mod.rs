//! Physics simulation module.
//!
//! Kinematics of a single simulated drive: point-to-point moves with a
//! triangular/trapezoidal velocity profile, velocity moves and
//! controlled stops.

mod axis;

pub use axis::AxisKinematics;
