//! # TANDEM Control Unit
//!
//! Connects to the field bus, prepares the load and lift axes, serves one
//! operator client and runs the waypoint sequence on request.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use tandem_control_unit::config::{Cadence, TandemConfig, load_config};
use tandem_control_unit::cycle::RtSettings;
use tandem_control_unit::error::ControlError;
use tandem_control_unit::safety::termination::{TerminationLatch, install_signal_handlers};
use tandem_control_unit::session::Session;
use tandem_hal::DriverRegistry;

/// TANDEM Control Unit: two-axis motion sequencer
#[derive(Parser, Debug)]
#[command(name = "tandem_control_unit")]
#[command(version)]
#[command(about = "Two-axis motion sequencing engine with telemetry gateway")]
struct Args {
    /// Path to the configuration file.
    #[arg(default_value = tandem_common::consts::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Field-bus driver (overrides `[bus] driver`).
    #[arg(long)]
    driver: Option<String>,

    /// Cycle cadence (overrides `[cycle] cadence`).
    #[arg(long, value_enum)]
    cadence: Option<Cadence>,

    /// Gateway bind address (overrides `[gateway] bind`).
    #[arg(long)]
    bind: Option<String>,

    /// CPU core to pin the cycle thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority of the cycle thread.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, Level::INFO);
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    let level = config
        .shared
        .log_level
        .as_directive()
        .parse()
        .unwrap_or(Level::INFO);
    setup_tracing(&args, level);

    info!(
        "TANDEM Control Unit v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    match run(&args, config) {
        Ok(0) => info!("TANDEM Control Unit shutdown complete"),
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    }
}

fn load(args: &Args) -> Result<TandemConfig, ControlError> {
    let mut config = load_config(&args.config)?;
    if let Some(driver) = &args.driver {
        config.bus.driver = driver.clone();
    }
    if let Some(cadence) = args.cadence {
        config.cycle.cadence = cadence;
    }
    if let Some(bind) = &args.bind {
        config.gateway.bind = bind.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Set up signals and the bus, then hand over to the session.
///
/// Session failures are reported and shut down inside the session; only
/// their exit code comes back here.
fn run(args: &Args, config: TandemConfig) -> Result<i32, ControlError> {
    let latch = Arc::new(TerminationLatch::new());
    install_signal_handlers(Arc::clone(&latch))?;

    let registry = DriverRegistry::with_builtin()?;
    info!("Drivers: {:?}", registry.list_drivers());
    let bus = registry.create_driver(&config.bus.driver)?;

    let session = Session::new(config, latch).with_rt(RtSettings {
        cpu_core: args.cpu_core,
        priority: args.rt_priority,
    });
    Ok(session.run(bus).map_or_else(|e| e.exit_code(), |()| 0))
}

/// Setup tracing subscriber; `--verbose` wins over the configured level.
fn setup_tracing(args: &Args, default: Level) {
    let level = if args.verbose { Level::DEBUG } else { default };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
