//! Waypoint table for the lift axis.
//!
//! Fixed capacity, loaded once from `[sequence]`, consumed front to back
//! by the lift process. The cursor only moves forward until [`rewind`].
//!
//! [`rewind`]: MotionSequence::rewind

use heapless::Vec;

use tandem_common::consts::MAX_WAYPOINTS;
use tandem_common::drive::types::BufferMode;

use crate::config::SequenceConfig;

/// One absolute move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: f64,
    pub velocity: f64,
    pub buffer: BufferMode,
}

impl Waypoint {
    pub const fn new(position: f64, velocity: f64) -> Self {
        Self {
            position,
            velocity,
            buffer: BufferMode::Buffered,
        }
    }
}

/// Ordered waypoints plus the index of the next one to issue.
#[derive(Debug, Clone, Default)]
pub struct MotionSequence {
    waypoints: Vec<Waypoint, MAX_WAYPOINTS>,
    cursor: usize,
}

impl MotionSequence {
    /// Build from a list; entries beyond capacity are dropped.
    pub fn from_waypoints(waypoints: impl IntoIterator<Item = Waypoint>) -> Self {
        let mut table = Vec::new();
        for wp in waypoints {
            if table.push(wp).is_err() {
                break;
            }
        }
        Self {
            waypoints: table,
            cursor: 0,
        }
    }

    pub fn from_config(config: &SequenceConfig) -> Self {
        Self::from_waypoints(config.waypoints.iter().map(|wp| Waypoint {
            position: wp.position,
            velocity: wp.velocity,
            buffer: wp.buffer_mode,
        }))
    }

    /// Next waypoint and its index; advances the cursor.
    pub fn next(&mut self) -> Option<(usize, Waypoint)> {
        let index = self.cursor;
        let wp = *self.waypoints.get(index)?;
        self.cursor += 1;
        Some((index, wp))
    }

    #[inline]
    pub fn has_more(&self) -> bool {
        self.cursor < self.waypoints.len()
    }

    #[inline]
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Index of the next waypoint to issue.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }
}
