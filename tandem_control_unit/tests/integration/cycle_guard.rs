//! Integration test: cycle re-entrancy.
//!
//! A cycle invoked while another is still running must return without
//! touching any state, and must be counted.

use parking_lot::Mutex;
use std::io;
use std::sync::{Arc, OnceLock, Weak};

use tandem_control_unit::cycle::{ControlLoop, CycleOutcome};
use tandem_control_unit::telemetry::TelemetrySink;

use super::support::{CYCLE_STEP, Engine, Quiet, SimRig, table};

/// Sink that tries to start a nested cycle while the current one publishes.
struct ReentrantSink {
    control: Arc<OnceLock<Weak<ControlLoop>>>,
    outcomes: Arc<Mutex<Vec<bool>>>,
}

impl TelemetrySink for ReentrantSink {
    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        if let Some(control) = self.control.get().and_then(Weak::upgrade) {
            assert!(control.is_cycle_active());
            let skipped = matches!(control.run_cycle(), Ok(CycleOutcome::Skipped));
            self.outcomes.lock().push(skipped);
        }
        Ok(())
    }
}

#[test]
fn nested_cycle_is_skipped() {
    let rig = SimRig::new(Arc::new(Quiet));
    let (engine, _bus, _handle) = Engine::new(rig, &table(&[(100.0, 1000.0)]), 0);

    let slot = Arc::new(OnceLock::new());
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let mut core = engine.control.into_core();
    core.set_sink(Box::new(ReentrantSink {
        control: Arc::clone(&slot),
        outcomes: Arc::clone(&outcomes),
    }));
    let control = Arc::new(ControlLoop::new(core));
    assert!(slot.set(Arc::downgrade(&control)).is_ok());

    control.request_run();
    for _ in 0..3 {
        assert!(matches!(control.run_cycle(), Ok(CycleOutcome::Executed(_))));
    }

    let outcomes = outcomes.lock().clone();
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|skipped| *skipped));

    let stats = control.stats();
    assert_eq!(stats.cycle_count, 3);
    assert_eq!(stats.skipped, outcomes.len() as u64);
    assert!(!control.is_cycle_active());
}

#[test]
fn nested_cycles_issue_no_extra_moves() {
    let rig = SimRig::new(Arc::new(Quiet));
    let (engine, _bus, _handle) =
        Engine::new(rig, &table(&[(100.0, 1000.0), (0.0, 1000.0)]), 0);
    let clock = engine.clock.clone();
    let probe = engine.probe.clone();

    let slot = Arc::new(OnceLock::new());
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let mut core = engine.control.into_core();
    core.set_sink(Box::new(ReentrantSink {
        control: Arc::clone(&slot),
        outcomes: Arc::clone(&outcomes),
    }));
    let control = Arc::new(ControlLoop::new(core));
    assert!(slot.set(Arc::downgrade(&control)).is_ok());

    control.request_run();
    let mut cycles = 0;
    while cycles < 40 {
        control.run_cycle().unwrap();
        clock.advance(CYCLE_STEP);
        cycles += 1;
        if control.is_idle() {
            break;
        }
    }
    assert!(control.is_idle());

    let lift = probe.axis("lift").unwrap();
    assert_eq!(lift.moves(), vec![(100.0, 1000.0), (0.0, 1000.0)]);
    assert_eq!(control.stats().cycle_count, cycles);
    assert!(outcomes.lock().iter().all(|skipped| *skipped));
}
