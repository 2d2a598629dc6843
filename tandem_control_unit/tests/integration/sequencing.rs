//! Integration test: waypoint sequencing on the simulation bus.
//!
//! Validates that the lift walks its table strictly in order, that no
//! move is issued before the previous one reached standstill, and that
//! the load holds until the lift process is back to idle.

use std::sync::Arc;

use tandem_common::drive::driver::ERR_ERROR_STOP;
use tandem_common::drive::types::OperatingMode;
use tandem_control_unit::error::ControlError;
use tandem_control_unit::state::{LiftStep, LoadStep, MainState};
use tandem_hal::drivers::simulation::SimCommand;

use super::support::{CYCLE_STEP, Engine, Quiet, SimRig, table};

fn engine(points: &[(f64, f64)], step_timeout: u32) -> Engine {
    let rig = SimRig::new(Arc::new(Quiet));
    Engine::new(rig, &table(points), step_timeout).0
}

// ── Ordering ────────────────────────────────────────────────────────

#[test]
fn waypoints_issued_in_order() {
    let engine = engine(&[(4000.0, 2000.0), (0.0, 4000.0), (8000.0, 8000.0)], 0);
    let reports = engine.run_to_idle(60);

    let lift = engine.probe.axis("lift").unwrap();
    assert_eq!(lift.moves(), vec![(4000.0, 2000.0), (0.0, 4000.0), (8000.0, 8000.0)]);
    assert!((lift.position() - 8000.0).abs() < 1e-6);

    let issued: Vec<usize> = reports.iter().filter_map(|r| r.waypoint).collect();
    assert_eq!(issued, vec![0, 1, 2]);

    let history = lift.history();
    assert_eq!(history.first(), Some(&SimCommand::PowerOn));
    assert_eq!(&history[history.len() - 2..], &[SimCommand::Stop, SimCommand::PowerOff]);
}

#[test]
fn load_only_powers_holds_and_stops() {
    let engine = engine(&[(100.0, 1000.0)], 0);
    engine.run_to_idle(30);

    let load = engine.probe.axis("load").unwrap();
    assert_eq!(
        load.history(),
        vec![SimCommand::PowerOn, SimCommand::Stop, SimCommand::PowerOff]
    );
}

#[test]
fn move_waits_for_standstill() {
    let engine = engine(&[(4000.0, 2000.0), (0.0, 4000.0)], 0);
    let lift = engine.probe.axis("lift").unwrap();
    engine.run_until_issued(0, 20);
    lift.set_stalled(true);
    engine.clock.advance(CYCLE_STEP);
    for _ in 0..20 {
        let report = engine.step();
        assert!(!report.snapshot.lift.status.is_standstill());
        assert_eq!(report.waypoint, None);
    }
    assert_eq!(lift.moves().len(), 1);
    let sub = engine.control.with_core(|core| core.lift_process().sub());
    assert_eq!(sub, LiftStep::WaitMoveDone { index: 0 });

    lift.set_stalled(false);
    for _ in 0..30 {
        engine.step();
        if engine.control.is_idle() {
            break;
        }
    }
    assert!(engine.control.is_idle());
    assert_eq!(lift.moves().len(), 2);
}

#[test]
fn load_holds_while_lift_runs() {
    let engine = engine(&[(500.0, 1000.0), (0.0, 1000.0)], 0);
    engine.control.request_run();
    let mut released_at = None;

    for cycle in 0..40 {
        engine.step();
        let (lift_main, load_sub) = engine
            .control
            .with_core(|core| (core.lift_process().main(), core.load_process().sub()));
        if lift_main == MainState::Running {
            assert!(
                matches!(
                    load_sub,
                    LoadStep::PowerOn | LoadStep::WaitPowerOn | LoadStep::Hold
                ),
                "load left Hold at cycle {cycle} while lift still running"
            );
        } else if released_at.is_none() && load_sub != LoadStep::Hold {
            released_at = Some(cycle);
        }
        if engine.control.is_idle() {
            break;
        }
    }
    assert!(engine.control.is_idle());
    assert!(released_at.is_some());
}

#[test]
fn empty_table_still_powers_through() {
    let engine = engine(&[], 0);
    let reports = engine.run_to_idle(20);

    let lift = engine.probe.axis("lift").unwrap();
    assert!(lift.moves().is_empty());
    assert!(reports.iter().all(|r| r.waypoint.is_none()));
    assert_eq!(
        lift.history(),
        vec![SimCommand::PowerOn, SimCommand::Stop, SimCommand::PowerOff]
    );
}

#[test]
fn restart_replays_the_table() {
    let engine = engine(&[(300.0, 1000.0), (0.0, 1000.0)], 0);
    engine.run_to_idle(30);
    engine.control.rewind();
    engine.run_to_idle(30);

    let moves = engine.probe.axis("lift").unwrap().moves();
    assert_eq!(
        moves,
        vec![(300.0, 1000.0), (0.0, 1000.0), (300.0, 1000.0), (0.0, 1000.0)]
    );
}

// ── Telemetry ───────────────────────────────────────────────────────

#[test]
fn every_cycle_publishes_one_record() {
    let engine = engine(&[(200.0, 1000.0), (0.0, 1000.0)], 0);
    let reports = engine.run_to_idle(30);
    let lines = engine.sink.lines();

    let records: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
    assert_eq!(records.len(), reports.len());
    for record in &records {
        assert!(record.starts_with("TIME,12:0:5,LOAD,"), "{record}");
        assert!(record.contains(",LIFT,"), "{record}");
    }

    // One blank marker directly before the record of each issuing cycle.
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.is_empty())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(markers.len(), 2);
    for i in markers {
        assert!(!lines[i + 1].is_empty());
    }
}

#[test]
fn lift_current_reported_while_powered() {
    let engine = engine(&[(1000.0, 1000.0)], 0);
    let reports = engine.run_to_idle(30);
    assert!(reports.iter().any(|r| r.snapshot.lift.current_ma > 0));
    assert_eq!(reports[0].snapshot.lift.current_ma, 0);
}

// ── Faults ──────────────────────────────────────────────────────────

#[test]
fn stuck_wait_times_out() {
    let engine = engine(&[(4000.0, 2000.0)], 5);
    let lift = engine.probe.axis("lift").unwrap();
    engine.run_until_issued(0, 20);
    lift.set_stalled(true);

    let mut failure = None;
    for _ in 0..10 {
        match engine.control.run_cycle() {
            Ok(_) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    match failure {
        Some(ControlError::StepTimeout { process, step, .. }) => {
            assert_eq!(process, "lift");
            assert_eq!(step, "WaitMoveDone");
        }
        other => panic!("expected step timeout, got {other:?}"),
    }
}

#[test]
fn error_stop_during_run_is_fatal() {
    let engine = engine(&[(4000.0, 2000.0)], 0);
    let lift = engine.probe.axis("lift").unwrap();
    engine.run_until_issued(0, 20);
    lift.inject_error_stop(false);

    let err = engine.control.run_cycle().unwrap_err();
    assert!(
        matches!(&err, ControlError::ErrorStop { axis, code, .. } if axis == "lift" && *code == ERR_ERROR_STOP),
        "{err}"
    );
    assert!(!engine.control.is_cycle_active());
}

#[test]
fn move_refused_without_confirmed_mode() {
    let mut rig = SimRig::new(Arc::new(Quiet));
    rig.lift.switch_mode(OperatingMode::ProfileVelocity).unwrap();
    let (engine, _bus, _handle) = Engine::new(rig, &table(&[(100.0, 100.0)]), 0);
    engine.control.request_run();

    let mut failure = None;
    for _ in 0..10 {
        if let Err(e) = engine.control.run_cycle() {
            failure = Some(e);
            break;
        }
        engine.clock.advance(CYCLE_STEP);
    }
    assert!(matches!(failure, Some(ControlError::ModeMismatch { .. })));
    assert!(engine.probe.axis("lift").unwrap().moves().is_empty());
}
