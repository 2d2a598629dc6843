//! Integration test: operator session end to end.
//!
//! A real TCP client talks to [`Session::serve`] while the engine drives
//! the simulation bus on a real-time clock.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tandem_common::config::LogLevel;
use tandem_control_unit::config::{Cadence, TandemConfig, WaypointConfig};
use tandem_control_unit::error::ControlError;
use tandem_control_unit::gateway::{Gateway, HELLO, RESTART_PROMPT, USAGE};
use tandem_control_unit::safety::{TerminationLatch, TerminationReason};
use tandem_control_unit::session::Session;
use tandem_common::drive::types::BufferMode;
use tandem_hal::drivers::simulation::SimCommand;
use tandem_hal::{SimBus, SimClock, SimProbe};

fn session_config() -> TandemConfig {
    let mut config = TandemConfig::default();
    config.shared.log_level = LogLevel::Debug;
    config.sequence.waypoints = [50.0, 0.0]
        .into_iter()
        .map(|position| WaypointConfig {
            position,
            velocity: 50_000.0,
            buffer_mode: BufferMode::Buffered,
        })
        .collect();
    config.cycle.cadence = Cadence::Polling;
    config.cycle.max_polls = 2000;
    config.cycle.poll_interval_us = 100;
    config.gateway.bind = "127.0.0.1:0".to_string();
    config
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(20))).unwrap();
        let writer = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    fn line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line
    }

    fn expect(&mut self, expected: &str) {
        assert_eq!(self.line(), expected);
    }

    fn send(&mut self, text: &str) {
        self.writer.write_all(text.as_bytes()).unwrap();
    }

    /// Send parameters and check the date reply.
    fn start_run(&mut self, request: &str) {
        self.send(request);
        let date = self.line();
        let parts: Vec<&str> = date.trim_end().split('-').collect();
        assert_eq!(parts.len(), 3, "{date:?}");
        assert!(parts.iter().all(|p| p.parse::<u32>().is_ok()), "{date:?}");
    }

    /// Telemetry lines up to the restart prompt.
    fn telemetry(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.line();
            assert!(!line.is_empty(), "server closed during run");
            if line == RESTART_PROMPT {
                return lines;
            }
            lines.push(line.trim_end_matches('\n').to_string());
        }
    }
}

fn serve_with<F>(latch: Arc<TerminationLatch>, client: F) -> (Result<(), ControlError>, SimProbe)
where
    F: FnOnce(SocketAddr) + Send,
{
    let bus = SimBus::with_clock(SimClock::realtime());
    let probe = bus.probe();
    let gateway = Gateway::bind("127.0.0.1:0", Arc::clone(&latch)).unwrap();
    let addr = gateway.local_addr().unwrap();
    let session = Session::new(session_config(), latch);

    let result = thread::scope(|scope| {
        let server = scope.spawn(|| session.serve(Box::new(bus), &gateway));
        client(addr);
        server.join().unwrap()
    });
    (result, probe)
}

fn check_run(lines: &[String], waypoints: usize) {
    let markers = lines.iter().filter(|l| l.is_empty()).count();
    assert_eq!(markers, waypoints);
    let records: Vec<&String> = lines.iter().filter(|l| !l.is_empty()).collect();
    assert!(!records.is_empty());
    for record in records {
        let fields: Vec<&str> = record.split(',').collect();
        assert_eq!(fields.len(), 6, "{record}");
        assert_eq!(fields[0], "TIME");
        assert_eq!(fields[2], "LOAD");
        assert_eq!(fields[4], "LIFT");
        assert!(fields[3].parse::<i32>().is_ok());
        assert!(fields[5].parse::<i32>().is_ok());
    }
}

// ── Happy paths ─────────────────────────────────────────────────────

#[test]
fn single_run_then_quit() {
    let (result, probe) = serve_with(Arc::new(TerminationLatch::new()), |addr| {
        let mut client = Client::connect(addr);
        client.expect(HELLO);
        client.expect(USAGE);
        client.start_run("500 5\n");
        check_run(&client.telemetry(), 2);
        client.send("q\n");
    });
    result.unwrap();

    let load = probe.axis("load").unwrap();
    assert!(load.history().contains(&SimCommand::Execute("TC=0.50".to_string())));
    assert_eq!(load.torque_limit_ma(), Some(500));
    assert_eq!(
        probe.axis("lift").unwrap().moves(),
        vec![(50.0, 50_000.0), (0.0, 50_000.0)]
    );
    assert!(probe.is_closed());
}

#[test]
fn restart_keeps_previous_parameters() {
    let (result, probe) = serve_with(Arc::new(TerminationLatch::new()), |addr| {
        let mut client = Client::connect(addr);
        client.expect(HELLO);
        client.expect(USAGE);
        client.start_run("800,5\n");
        check_run(&client.telemetry(), 2);

        client.send("r\n");
        client.expect(USAGE);
        client.start_run("\n");
        check_run(&client.telemetry(), 2);
        client.send("done\n");
    });
    result.unwrap();

    let torque_commands = probe
        .axis("load")
        .unwrap()
        .history()
        .into_iter()
        .filter(|c| *c == SimCommand::Execute("TC=0.80".to_string()))
        .count();
    assert_eq!(torque_commands, 2);
    assert_eq!(probe.axis("lift").unwrap().moves().len(), 4);
}

#[test]
fn invalid_parameters_prompt_again() {
    let (result, probe) = serve_with(Arc::new(TerminationLatch::new()), |addr| {
        let mut client = Client::connect(addr);
        client.expect(HELLO);
        client.expect(USAGE);
        client.send("zero torque\n");
        client.expect(USAGE);
        client.send("0 5\n");
        client.expect(USAGE);
        client.writer.write_all(b"\xff\xfe 100\n").unwrap();
        client.expect(USAGE);
        client.start_run("250 5\n");
        check_run(&client.telemetry(), 2);
        client.send("\n");
    });
    result.unwrap();
    assert_eq!(probe.axis("load").unwrap().torque_limit_ma(), Some(250));
}

// ── Terminations ────────────────────────────────────────────────────

#[test]
fn client_disconnect_ends_session_cleanly() {
    let (result, probe) = serve_with(Arc::new(TerminationLatch::new()), |addr| {
        let mut client = Client::connect(addr);
        client.expect(HELLO);
        client.expect(USAGE);
    });
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        ControlError::Terminated(TerminationReason::Operator)
    ));
    assert_eq!(err.exit_code(), 0);

    let lift = probe.axis("lift").unwrap();
    assert!(lift.moves().is_empty());
    assert!(probe.is_closed());
}

#[test]
fn signal_reaches_shutdown_while_client_not_reading() {
    let latch = Arc::new(TerminationLatch::new());
    let trigger = Arc::clone(&latch);
    let (result, probe) = serve_with(latch, move |addr| {
        let mut client = Client::connect(addr);
        client.send("500 1\n");
        thread::sleep(Duration::from_millis(100));
        trigger.trigger(TerminationReason::Terminate);
        // Stay connected so the server sees the signal, not a disconnect.
        thread::sleep(Duration::from_millis(500));
        drop(client);
    });
    assert!(matches!(
        result,
        Err(ControlError::Terminated(TerminationReason::Terminate))
    ));
    assert!(probe.is_closed());
    let load = probe.axis("load").unwrap();
    assert!(load.history().contains(&SimCommand::PowerOff));
}

#[test]
fn signal_while_waiting_for_client() {
    let latch = Arc::new(TerminationLatch::new());
    let trigger = Arc::clone(&latch);
    let (result, probe) = serve_with(latch, move |_addr| {
        thread::sleep(Duration::from_millis(150));
        trigger.trigger(TerminationReason::Terminate);
    });
    assert!(matches!(
        result,
        Err(ControlError::Terminated(TerminationReason::Terminate))
    ));
    assert!(probe.is_closed());
    assert!(probe.axis("lift").is_none_or(|lift| lift.moves().is_empty()));
}
