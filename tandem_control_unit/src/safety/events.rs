//! Drive-event monitor.
//!
//! Registered with the bus at connect time. Logs every event; fatal kinds
//! latch a [`TerminationReason::DriveEvent`] that the scheduler picks up
//! at the start of its next iteration.

use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use tandem_common::drive::event::{DriveEvent, DriveEventHandler, DriveEventKind};

use super::termination::{TerminationLatch, TerminationReason};

pub struct EventMonitor {
    latch: Arc<TerminationLatch>,
}

impl EventMonitor {
    pub fn new(latch: Arc<TerminationLatch>) -> Self {
        Self { latch }
    }
}

impl DriveEventHandler for EventMonitor {
    fn on_event(&self, event: &DriveEvent) {
        let DriveEvent {
            kind,
            axis_ref,
            code,
        } = *event;
        match kind {
            DriveEventKind::Emergency | DriveEventKind::SystemError => {
                error!("{kind:?} on axis ref {axis_ref}, code {code:#06x}");
            }
            DriveEventKind::DriveError | DriveEventKind::HeartbeatFail => {
                warn!("{kind:?} on axis ref {axis_ref}, code {code:#06x}");
            }
            DriveEventKind::MotionEnded | DriveEventKind::HomeEnded => {
                debug!("{kind:?} on axis ref {axis_ref}");
            }
            DriveEventKind::PdoReceived => trace!("PDO received, axis ref {axis_ref}"),
        }

        if kind.is_fatal() && self.latch.trigger(TerminationReason::DriveEvent) {
            error!("Drive event latched shutdown");
        }
    }
}
