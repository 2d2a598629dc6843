//! Safe-shutdown sequence.
//!
//! Order: stop both axes, power both off, wait until each reports
//! `DISABLED`, return the load axis to `ProfilePosition`, close the bus.
//! A failing step is logged and the sequence continues; motion is always
//! stopped before power is removed.

use tracing::{error, info, warn};

use tandem_common::drive::driver::FieldBus;
use tandem_common::drive::types::{ConnectionHandle, OperatingMode};

use crate::axis::AxisProxy;
use crate::error::ControlError;

/// Failures collected while shutting down.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub failures: Vec<ControlError>,
}

impl ShutdownReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: &str, target: &str, result: Result<(), ControlError>) {
        if let Err(e) = result {
            error!("Shutdown: {step} on {target} failed: {e}");
            self.failures.push(e);
        }
    }
}

/// Bring both axes to a de-energised state and release the bus.
pub fn safe_shutdown(
    load: &mut AxisProxy,
    lift: &mut AxisProxy,
    bus: &mut dyn FieldBus,
    handle: ConnectionHandle,
) -> ShutdownReport {
    info!("Safe shutdown");
    let mut report = ShutdownReport::default();

    for axis in [&mut *load, &mut *lift] {
        let result = axis.stop();
        report.record("stop", axis.name(), result);
    }
    for axis in [&mut *load, &mut *lift] {
        let result = axis.power_off();
        report.record("power_off", axis.name(), result);
    }
    for axis in [&mut *load, &mut *lift] {
        // An error-stopped drive is already de-energised.
        let result = axis
            .wait_until("DISABLED", |s| s.is_disabled() || s.is_error_stop())
            .map(|_| ());
        report.record("wait DISABLED", axis.name(), result);
    }

    let result = load.switch_mode(OperatingMode::ProfilePosition);
    report.record("restore ProfilePosition", load.name(), result);

    let result = bus.close(handle).map_err(ControlError::from);
    report.record("close", bus.name(), result);

    if report.is_clean() {
        info!("Safe shutdown complete");
    } else {
        warn!("Safe shutdown finished with {} failure(s)", report.failures.len());
    }
    report
}

/// Startup abort: no motion command, only power off and close.
pub fn abort_startup<'a>(
    axes: impl IntoIterator<Item = &'a mut AxisProxy>,
    bus: &mut dyn FieldBus,
    handle: ConnectionHandle,
) -> ShutdownReport {
    warn!("Aborting startup");
    let mut report = ShutdownReport::default();
    for axis in axes {
        let result = axis.power_off();
        report.record("power_off", axis.name(), result);
    }
    let result = bus.close(handle).map_err(ControlError::from);
    report.record("close", bus.name(), result);
    report
}
