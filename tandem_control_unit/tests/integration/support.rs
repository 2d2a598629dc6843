//! Shared rig for the integration tests.

use chrono::NaiveTime;
use std::sync::Arc;
use std::time::Duration;

use tandem_common::drive::driver::FieldBus;
use tandem_common::drive::event::{DriveEvent, DriveEventHandler};
use tandem_common::drive::types::{ConnectionHandle, OperatingMode};
use tandem_control_unit::axis::{AxisProxy, PollPolicy};
use tandem_control_unit::cycle::{CycleReport, ControlCore, ControlLoop, CycleOutcome};
use tandem_control_unit::sequence::{MotionSequence, Waypoint};
use tandem_control_unit::telemetry::RecordingSink;
use tandem_hal::drivers::simulation::SimAxisHandle;
use tandem_hal::{SimBus, SimClock, SimProbe};

pub const FAST: PollPolicy = PollPolicy::new(200, Duration::ZERO);

/// Simulated time between two cycles; long enough for any test move.
pub const CYCLE_STEP: Duration = Duration::from_secs(10);

pub struct Quiet;

impl DriveEventHandler for Quiet {
    fn on_event(&self, _event: &DriveEvent) {}
}

pub fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 5).unwrap_or_default()
}

/// Connected simulation bus with both axes in profile-position mode.
pub struct SimRig {
    pub bus: SimBus,
    pub handle: ConnectionHandle,
    pub probe: SimProbe,
    pub clock: SimClock,
    pub load: AxisProxy,
    pub lift: AxisProxy,
}

impl SimRig {
    pub fn new(events: Arc<dyn DriveEventHandler>) -> Self {
        Self::with_bus(SimBus::with_clock(SimClock::manual()), events)
    }

    pub fn with_bus(mut bus: SimBus, events: Arc<dyn DriveEventHandler>) -> Self {
        let clock = bus.clock().clone();
        let probe = bus.probe();
        let handle = bus.connect(Duration::from_secs(1), events).unwrap();
        let mut load = AxisProxy::new(bus.init_axis("load", handle).unwrap(), FAST);
        let mut lift = AxisProxy::new(bus.init_axis("lift", handle).unwrap(), FAST);
        for axis in [&mut load, &mut lift] {
            axis.set_operating_mode(OperatingMode::ProfilePosition).unwrap();
            axis.wait_for_mode(OperatingMode::ProfilePosition).unwrap();
        }
        for name in ["load", "lift"] {
            probe.axis(name).unwrap().clear_history();
        }
        Self {
            bus,
            handle,
            probe,
            clock,
            load,
            lift,
        }
    }

    pub fn lift_axis(&self) -> SimAxisHandle {
        self.probe.axis("lift").unwrap()
    }

    pub fn load_axis(&self) -> SimAxisHandle {
        self.probe.axis("load").unwrap()
    }
}

/// Engine over `rig`'s axes, recording telemetry.
pub struct Engine {
    pub control: ControlLoop,
    pub sink: RecordingSink,
    pub clock: SimClock,
    pub probe: SimProbe,
}

impl Engine {
    pub fn new(rig: SimRig, table: &[Waypoint], step_timeout: u32) -> (Self, SimBus, ConnectionHandle) {
        let SimRig {
            bus,
            handle,
            probe,
            clock,
            load,
            lift,
        } = rig;
        let mut core = ControlCore::new(
            load,
            lift,
            MotionSequence::from_waypoints(table.iter().copied()),
            step_timeout,
        );
        let sink = RecordingSink::new();
        core.set_sink(Box::new(sink.clone()));
        core.set_clock(noon);
        let engine = Self {
            control: ControlLoop::new(core),
            sink,
            clock,
            probe,
        };
        (engine, bus, handle)
    }

    /// One cycle without moving simulated time.
    pub fn cycle(&self) -> CycleReport {
        match self.control.run_cycle().unwrap() {
            CycleOutcome::Executed(report) => report,
            CycleOutcome::Skipped => panic!("cycle unexpectedly skipped"),
        }
    }

    /// One cycle, then let simulated time pass.
    pub fn step(&self) -> CycleReport {
        let report = self.cycle();
        self.clock.advance(CYCLE_STEP);
        report
    }

    /// Request a run and cycle until waypoint `index` has just been issued.
    /// Simulated time has not moved since.
    pub fn run_until_issued(&self, index: usize, max_cycles: usize) {
        self.control.request_run();
        for _ in 0..max_cycles {
            if self.cycle().waypoint == Some(index) {
                return;
            }
            self.clock.advance(CYCLE_STEP);
        }
        panic!("waypoint {index} not issued after {max_cycles} cycles");
    }

    /// Request a run and cycle until both processes are idle again.
    pub fn run_to_idle(&self, max_cycles: usize) -> Vec<CycleReport> {
        self.control.request_run();
        let mut reports = Vec::new();
        for _ in 0..max_cycles {
            reports.push(self.step());
            if self.control.is_idle() {
                return reports;
            }
        }
        panic!("still running after {max_cycles} cycles");
    }
}

pub fn table(points: &[(f64, f64)]) -> Vec<Waypoint> {
    points.iter().map(|&(p, v)| Waypoint::new(p, v)).collect()
}
