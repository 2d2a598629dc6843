//! Integration test: configuration file to prepared axes.
//!
//! Validates: TOML file on disk → validated config → MotorInit on the
//! simulation bus, and that every startup failure leaves the drives
//! without a single motion command.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tandem_common::config::ConfigError;
use tandem_common::drive::types::OperatingMode;
use tandem_control_unit::config::{Cadence, TandemConfig, load_config};
use tandem_control_unit::error::ControlError;
use tandem_control_unit::safety::{TerminationLatch, TerminationReason};
use tandem_control_unit::session::Session;
use tandem_hal::drivers::simulation::{SimAxisConfig, SimCommand};
use tandem_hal::{SimBus, SimClock, SimProbe};

const RIG_TOML: &str = r#"
[shared]
service_name = "tandem-test"
log_level = "debug"

[bus]
driver = "simulation"

[axes.load]
name = "load"
operating_mode = "profile_torque"

[axes.lift]
name = "lift"

[[sequence.waypoints]]
position = 4000.0
velocity = 2000.0

[[sequence.waypoints]]
position = 0.0
velocity = 4000.0

[[sequence.waypoints]]
position = 8000.0
velocity = 8000.0

[cycle]
cadence = "polling"
max_polls = 200
poll_interval_us = 1

[gateway]
bind = "127.0.0.1:0"
"#;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn rig_config() -> TandemConfig {
    let file = write_config(RIG_TOML);
    load_config(file.path()).unwrap()
}

fn assert_no_motion(probe: &SimProbe) {
    for name in ["load", "lift"] {
        if let Some(axis) = probe.axis(name) {
            let history = axis.history();
            assert!(!history.iter().any(SimCommand::is_motion), "{name}: {history:?}");
        }
    }
}

#[test]
fn config_file_loads_and_validates() {
    let config = rig_config();
    assert_eq!(config.shared.service_name, "tandem-test");
    assert_eq!(config.cycle.cadence, Cadence::Polling);
    assert_eq!(config.sequence.waypoints.len(), 3);
    assert_eq!(config.sequence.waypoints[2].position, 8000.0);
    assert_eq!(config.axes.load.operating_mode, Some(OperatingMode::ProfileTorque));
}

#[test]
fn invalid_config_file_is_rejected() {
    let file = write_config("[cycle]\npoll_interval_us = 0\n");
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
    assert!(matches!(
        load_config(Path::new("/nonexistent/tandem.toml")),
        Err(ConfigError::FileNotFound)
    ));
}

#[test]
fn motor_init_from_file_prepares_rig() {
    let bus = SimBus::with_clock(SimClock::manual());
    let probe = bus.probe();
    let session = Session::new(rig_config(), Arc::new(TerminationLatch::new()));

    let rig = session.motor_init(Box::new(bus)).unwrap();
    assert!(rig.control().is_idle());
    assert_eq!(rig.control().with_core(|core| core.table().len()), 3);

    let load = probe.axis("load").unwrap();
    let lift = probe.axis("lift").unwrap();
    assert_eq!(load.mode(), OperatingMode::ProfileTorque);
    assert_eq!(lift.mode(), OperatingMode::ProfilePosition);
    assert_eq!(load.unit_mode(), 1);
    assert_eq!(lift.unit_mode(), 5);
    assert!(probe.is_connected());
    assert_no_motion(&probe);
}

#[test]
fn error_stop_cleared_by_single_reset() {
    let bus = SimBus::with_clock(SimClock::manual()).preset(
        "load",
        SimAxisConfig {
            start_in_error_stop: true,
            ..SimAxisConfig::default()
        },
    );
    let probe = bus.probe();
    let session = Session::new(rig_config(), Arc::new(TerminationLatch::new()));

    session.motor_init(Box::new(bus)).unwrap();
    let resets = probe
        .axis("load")
        .unwrap()
        .history()
        .iter()
        .filter(|c| **c == SimCommand::Reset)
        .count();
    assert_eq!(resets, 1);
}

#[test]
fn latched_termination_aborts_startup() {
    let latch = Arc::new(TerminationLatch::new());
    latch.trigger(TerminationReason::Interrupt);
    let bus = SimBus::with_clock(SimClock::manual());
    let probe = bus.probe();
    let session = Session::new(rig_config(), latch);

    let err = session.motor_init(Box::new(bus)).err().unwrap();
    assert!(matches!(
        err,
        ControlError::Terminated(TerminationReason::Interrupt)
    ));
    assert_eq!(err.exit_code(), 0);
    assert_no_motion(&probe);
    assert!(probe.is_closed());
}

#[test]
fn stuck_mode_change_aborts_startup() {
    let bus = SimBus::with_clock(SimClock::manual()).preset(
        "load",
        SimAxisConfig {
            mode_latency_reads: 10_000,
            ..SimAxisConfig::default()
        },
    );
    let probe = bus.probe();
    let session = Session::new(rig_config(), Arc::new(TerminationLatch::new()));

    let err = session.motor_init(Box::new(bus)).err().unwrap();
    assert!(
        matches!(&err, ControlError::ConvergenceTimeout { axis, polls: 200, .. } if axis == "load"),
        "{err}"
    );
    assert_no_motion(&probe);
    assert!(probe.is_closed());
}
