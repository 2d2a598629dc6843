//! Axis kinematics.
//!
//! `AxisKinematics` integrates position and velocity for one drive in
//! fixed time steps. Units are counts, counts/s and counts/s².

use tandem_common::drive::types::MotionDefaults;
use tracing::trace;

/// Velocity below which the axis is considered stopped [counts/s].
const STOPPED_VELOCITY: f64 = 0.001;

/// Distance from the target at which a slow axis snaps onto it [counts].
const IN_POSITION_WINDOW: f64 = 0.5;

/// Point-to-point and velocity kinematics for one axis.
#[derive(Debug, Clone)]
pub struct AxisKinematics {
    position: f64,
    velocity: f64,
    target_position: f64,
    /// Cruise velocity of the active move (magnitude).
    max_velocity: f64,
    acceleration: f64,
    deceleration: f64,
}

impl AxisKinematics {
    /// Create a stopped axis at `position`.
    pub fn new(position: f64, defaults: &MotionDefaults) -> Self {
        Self {
            position,
            velocity: 0.0,
            target_position: position,
            max_velocity: defaults.velocity.abs(),
            acceleration: defaults.acceleration.abs().max(1.0),
            deceleration: defaults.deceleration.abs().max(1.0),
        }
    }

    /// Apply new acceleration and deceleration limits.
    pub fn set_limits(&mut self, defaults: &MotionDefaults) {
        self.acceleration = defaults.acceleration.abs().max(1.0);
        self.deceleration = defaults.deceleration.abs().max(1.0);
    }

    /// Start a point-to-point move.
    pub fn start_move(&mut self, target: f64, velocity: f64) {
        self.target_position = target;
        self.max_velocity = velocity.abs();
    }

    /// Advance a point-to-point move by `dt` seconds.
    ///
    /// Returns `true` once the axis rests on the target.
    pub fn step_to_target(&mut self, dt: f64) -> bool {
        let error = self.target_position - self.position;
        if error.abs() <= IN_POSITION_WINDOW && self.velocity.abs() <= self.deceleration * dt {
            self.settle();
            return true;
        }

        // Triangular velocity profile
        let stopping_distance = self.velocity * self.velocity / (2.0 * self.deceleration);
        let desired_velocity = if error.abs() <= stopping_distance {
            error.signum() * (2.0 * self.deceleration * error.abs()).sqrt().min(self.max_velocity)
        } else {
            error.signum() * self.max_velocity
        };

        let braking = desired_velocity.abs() < self.velocity.abs()
            || desired_velocity.signum() != self.velocity.signum();
        let limit = if braking { self.deceleration } else { self.acceleration } * dt;
        self.velocity += (desired_velocity - self.velocity).clamp(-limit, limit);
        self.velocity = self.velocity.clamp(-self.max_velocity, self.max_velocity);

        let next = self.position + self.velocity * dt;
        if (self.target_position - next).signum() != error.signum() {
            self.settle();
            return true;
        }
        self.position = next;

        trace!(
            "pos={:.3}, vel={:.3}, target={:.3}, err={:.3}",
            self.position, self.velocity, self.target_position, error
        );
        false
    }

    /// Ramp towards a signed velocity and integrate position.
    pub fn step_velocity(&mut self, velocity: f64, dt: f64) {
        let limit = self.acceleration * dt;
        self.velocity += (velocity - self.velocity).clamp(-limit, limit);
        self.position += self.velocity * dt;
    }

    /// Decelerate to stop. Returns `true` once stopped.
    pub fn decelerate_to_stop(&mut self, dt: f64) -> bool {
        if self.velocity.abs() < STOPPED_VELOCITY {
            self.velocity = 0.0;
            self.target_position = self.position;
            return true;
        }

        let decel = self.deceleration * dt;
        if self.velocity > 0.0 {
            self.velocity = (self.velocity - decel).max(0.0);
        } else {
            self.velocity = (self.velocity + decel).min(0.0);
        }
        self.position += self.velocity * dt;
        false
    }

    /// Drop all velocity immediately (power loss).
    pub fn halt(&mut self) {
        self.velocity = 0.0;
        self.target_position = self.position;
    }

    fn settle(&mut self) {
        self.position = self.target_position;
        self.velocity = 0.0;
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    pub fn target_position(&self) -> f64 {
        self.target_position
    }
}
