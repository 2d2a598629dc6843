//! Integration test: safe shutdown after an interrupted run.
//!
//! Validates:
//! 1. A moving lift is stopped before power is removed
//! 2. Both drives end de-energised and the load is back in ProfilePosition
//! 3. A drive in error-stop does not block the rest of the sequence

use std::sync::Arc;

use tandem_common::drive::types::OperatingMode;
use tandem_control_unit::error::ControlError;
use tandem_control_unit::safety::safe_shutdown;
use tandem_hal::drivers::simulation::SimCommand;

use super::support::{Engine, Quiet, SimRig, table};

fn position_of(history: &[SimCommand], command: &SimCommand) -> usize {
    history
        .iter()
        .position(|c| c == command)
        .unwrap_or_else(|| panic!("{command:?} missing from {history:?}"))
}

#[test]
fn interrupted_run_shuts_down_in_order() {
    let rig = SimRig::new(Arc::new(Quiet));
    let (engine, mut bus, handle) =
        Engine::new(rig, &table(&[(4000.0, 2000.0), (0.0, 4000.0)]), 0);
    engine.run_until_issued(0, 20);

    let lift = engine.probe.axis("lift").unwrap();
    let load = engine.probe.axis("load").unwrap();
    assert!(!lift.peek_status().is_standstill());
    lift.clear_history();
    load.clear_history();

    let report = engine.control.with_core(|core| {
        let (load, lift) = core.axes_mut();
        safe_shutdown(load, lift, &mut bus, handle)
    });
    assert!(report.is_clean(), "{:?}", report.failures);

    let history = lift.history();
    assert!(position_of(&history, &SimCommand::Stop) < position_of(&history, &SimCommand::PowerOff));
    assert!(!history.iter().any(|c| matches!(c, SimCommand::MoveAbsolute { .. })));
    assert!(lift.peek_status().is_disabled());

    assert_eq!(
        load.history(),
        vec![
            SimCommand::Stop,
            SimCommand::PowerOff,
            SimCommand::SetMode(OperatingMode::ProfilePosition),
        ]
    );
    assert!(load.peek_status().is_disabled());
    assert_eq!(load.mode(), OperatingMode::ProfilePosition);
    assert!(engine.probe.is_closed());
}

#[test]
fn error_stop_run_still_closes_bus() {
    let rig = SimRig::new(Arc::new(Quiet));
    let (engine, mut bus, handle) = Engine::new(rig, &table(&[(4000.0, 2000.0)]), 0);
    engine.run_until_issued(0, 20);

    let lift = engine.probe.axis("lift").unwrap();
    lift.inject_error_stop(true);
    let err = engine.control.run_cycle().unwrap_err();
    assert!(matches!(err, ControlError::ErrorStop { .. }));

    let report = engine.control.with_core(|core| {
        let (load, lift) = core.axes_mut();
        safe_shutdown(load, lift, &mut bus, handle)
    });
    // The error-stopped drive counts as de-energised.
    assert!(report.is_clean(), "{:?}", report.failures);
    assert!(engine.probe.axis("load").unwrap().peek_status().is_disabled());
    assert!(engine.probe.is_closed());
}

#[test]
fn failing_driver_call_is_recorded_and_skipped() {
    let rig = SimRig::new(Arc::new(Quiet));
    let (engine, mut bus, handle) = Engine::new(rig, &table(&[(4000.0, 2000.0)]), 0);
    engine.run_until_issued(0, 20);

    let lift = engine.probe.axis("lift").unwrap();
    lift.fail_next_call(tandem_common::drive::driver::ERR_COMMUNICATION);

    let report = engine.control.with_core(|core| {
        let (load, lift) = core.axes_mut();
        safe_shutdown(load, lift, &mut bus, handle)
    });
    assert_eq!(report.failures.len(), 1);
    assert!(lift.history().contains(&SimCommand::PowerOff));
    assert!(engine.probe.is_closed());
}
