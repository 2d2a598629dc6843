//! Top-level session flow.
//!
//! ```text
//! MotorInit → ServerInit → GetClientParams → RunMotors → EndOrRestart
//!                               ▲                             │ 'r'
//!                               └─────────────────────────────┘
//! ```
//!
//! Every error ends here: startup failures power the axes off without any
//! motion command, later failures run the full [`safe_shutdown`]. The
//! diagnostic line goes to the log and to stderr.

use std::sync::Arc;
use tracing::{error, info, warn};

use tandem_common::consts::{AXIS_COUNT, UM_POSITION_CONTROL_LOOP, UM_TORQUE_CONTROL_LOOP};
use tandem_common::drive::driver::{DriveError, FieldBus};
use tandem_common::drive::types::ConnectionHandle;

use crate::axis::{AxisProxy, PollPolicy};
use crate::config::{AxisConfig, TandemConfig};
use crate::cycle::{ControlCore, ControlLoop, RtSettings, RunEnd, Scheduler};
use crate::error::ControlError;
use crate::gateway::{ClientSession, Gateway, GatewayError, ParamLimits, RunParameters};
use crate::safety::events::EventMonitor;
use crate::safety::shutdown::{abort_startup, safe_shutdown};
use crate::safety::termination::{TerminationLatch, TerminationReason};
use crate::sequence::MotionSequence;

/// Session state, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    MotorInit,
    ServerInit,
    GetClientParams,
    RunMotors,
    EndOrRestart,
}

/// Connected bus and the control loop owning both axes.
pub struct Rig {
    bus: Box<dyn FieldBus>,
    handle: ConnectionHandle,
    control: ControlLoop,
}

impl Rig {
    pub fn control(&self) -> &ControlLoop {
        &self.control
    }
}

/// Map gateway outcomes that mean "stop" onto terminations.
fn from_gateway(e: GatewayError) -> ControlError {
    match e {
        GatewayError::Terminated(reason) => ControlError::Terminated(reason),
        GatewayError::Disconnected => {
            info!("Client disconnected");
            ControlError::Terminated(TerminationReason::Operator)
        }
        other => ControlError::Gateway(other),
    }
}

/// Log a fatal error; drive and engine faults also go to stderr.
pub fn report_fault(e: &ControlError) {
    match e {
        ControlError::Terminated(reason) => info!("Terminated by {reason}"),
        _ => {
            error!("{e}");
            eprintln!("{e}, bye");
        }
    }
}

pub struct Session {
    config: TandemConfig,
    latch: Arc<TerminationLatch>,
    rt: Option<RtSettings>,
}

impl Session {
    pub fn new(config: TandemConfig, latch: Arc<TerminationLatch>) -> Self {
        Self {
            config,
            latch,
            rt: None,
        }
    }

    pub fn with_rt(mut self, settings: RtSettings) -> Self {
        self.rt = Some(settings);
        self
    }

    /// Full session on the configured gateway address.
    pub fn run(&self, bus: Box<dyn FieldBus>) -> Result<(), ControlError> {
        let mut rig = self.motor_init(bus)?;
        let result = Gateway::bind(&self.config.gateway.bind, Arc::clone(&self.latch))
            .map_err(from_gateway)
            .and_then(|gateway| self.operate(&rig.control, &gateway));
        self.finish(&mut rig, result)
    }

    /// Full session on an already bound gateway.
    pub fn serve(&self, bus: Box<dyn FieldBus>, gateway: &Gateway) -> Result<(), ControlError> {
        let mut rig = self.motor_init(bus)?;
        let result = self.operate(&rig.control, gateway);
        self.finish(&mut rig, result)
    }

    // ── MotorInit ──

    /// Connect, initialise and prepare both axes.
    ///
    /// On failure the axes created so far are powered off, the bus is
    /// closed and the fault is reported.
    pub fn motor_init(&self, mut bus: Box<dyn FieldBus>) -> Result<Rig, ControlError> {
        info!("{:?}", SessionState::MotorInit);
        let events = Arc::new(EventMonitor::new(Arc::clone(&self.latch)));
        let handle = match bus.connect(self.config.bus.connect_timeout(), events) {
            Ok(handle) => handle,
            Err(e) => {
                let e = ControlError::from(e);
                report_fault(&e);
                return Err(e);
            }
        };
        info!(
            "Connected to {} v{} ({:?})",
            bus.name(),
            bus.version(),
            bus.bus_kind()
        );

        let mut axes = Vec::with_capacity(AXIS_COUNT);
        if let Err(e) = self.prepare_axes(bus.as_mut(), handle, &mut axes) {
            report_fault(&e);
            abort_startup(axes.iter_mut(), bus.as_mut(), handle);
            return Err(e);
        }

        let [load, lift]: [AxisProxy; AXIS_COUNT] = axes.try_into().map_err(|_| {
            ControlError::Drive(DriveError::Other("axis initialisation incomplete".into()))
        })?;
        let table = MotionSequence::from_config(&self.config.sequence);
        info!("Sequence: {} waypoint(s)", table.len());
        let core = ControlCore::new(load, lift, table, self.config.cycle.step_timeout_cycles);

        Ok(Rig {
            bus,
            handle,
            control: ControlLoop::new(core),
        })
    }

    fn init_axis(
        &self,
        bus: &mut dyn FieldBus,
        handle: ConnectionHandle,
        config: &AxisConfig,
    ) -> Result<AxisProxy, ControlError> {
        let driver = bus.init_axis(&config.name, handle)?;
        let mut axis = AxisProxy::new(driver, PollPolicy::from_config(&self.config.cycle));
        axis.apply_defaults(&config.motion)?;
        info!("Axis '{}' initialised (ref {})", axis.name(), axis.axis_ref());
        Ok(axis)
    }

    /// Startup steps 3 to 8; axes are pushed as soon as they exist.
    fn prepare_axes(
        &self,
        bus: &mut dyn FieldBus,
        handle: ConnectionHandle,
        axes: &mut Vec<AxisProxy>,
    ) -> Result<(), ControlError> {
        let kind = bus.bus_kind();
        let configs = [&self.config.axes.load, &self.config.axes.lift];

        for config in configs {
            axes.push(self.init_axis(bus, handle, config)?);
        }
        self.latch.check()?;

        for axis in axes.iter_mut() {
            axis.recover_error_stop()?;
        }
        self.latch.check()?;

        for (axis, config) in axes.iter_mut().zip(configs) {
            axis.set_operating_mode(config.mode_for(kind))?;
        }
        for (axis, config) in axes.iter_mut().zip(configs) {
            axis.wait_for_mode(config.mode_for(kind))?;
            info!("{}: operating mode {:?}", axis.name(), config.mode_for(kind));
        }
        self.latch.check()?;

        for axis in axes.iter_mut() {
            axis.wait_done_cleared()?;
        }

        let unit_modes = [UM_TORQUE_CONTROL_LOOP, UM_POSITION_CONTROL_LOOP];
        for (axis, um) in axes.iter_mut().zip(unit_modes) {
            axis.execute(&format!("UM={um}"))?;
        }

        if let Some(lift) = axes.get_mut(1) {
            info!("Lift position: {}", lift.actual_position()?);
        }
        self.latch.check()
    }

    // ── ServerInit .. EndOrRestart ──

    fn operate(&self, control: &ControlLoop, gateway: &Gateway) -> Result<(), ControlError> {
        info!("{:?}", SessionState::ServerInit);
        let mut client = gateway.accept().map_err(from_gateway)?;

        let limits = ParamLimits::from_config(&self.config.gateway);
        let mut params = RunParameters::from_config(&self.config.gateway);

        loop {
            info!("{:?}", SessionState::GetClientParams);
            params = self.get_client_params(&mut client, params, &limits)?;
            info!(
                "Read torque: {} mA, sampling: {} ms",
                params.torque_ma, params.sample_ms
            );

            info!("{:?}", SessionState::RunMotors);
            self.run_motors(control, &client, &params)?;

            info!("{:?}", SessionState::EndOrRestart);
            if client.ask_restart().map_err(from_gateway)? {
                info!("Restart requested");
                control.rewind();
                continue;
            }
            info!("End of program");
            return Ok(());
        }
    }

    fn get_client_params(
        &self,
        client: &mut ClientSession,
        previous: RunParameters,
        limits: &ParamLimits,
    ) -> Result<RunParameters, ControlError> {
        loop {
            match client.request_params(previous, limits) {
                Ok(params) => return Ok(params),
                Err(GatewayError::InvalidParams(reason)) => {
                    warn!("Invalid client params ({reason}), trying again");
                }
                Err(e) => return Err(from_gateway(e)),
            }
        }
    }

    fn run_motors(
        &self,
        control: &ControlLoop,
        client: &ClientSession,
        params: &RunParameters,
    ) -> Result<(), ControlError> {
        let sink = client.telemetry_sink().map_err(from_gateway)?;
        control.with_core(|core| -> Result<(), ControlError> {
            core.set_sink(Box::new(sink));
            let (load, _) = core.axes_mut();
            let command = params.torque_command();
            info!("Sending: {command}");
            load.execute(&command)?;
            Ok(())
        })?;

        control.request_run();
        let mut scheduler = Scheduler::new(self.config.cycle.cadence, params.sample_period());
        if let Some(rt) = self.rt {
            scheduler = scheduler.with_rt(rt);
        }
        match scheduler.run(control, &self.latch)? {
            RunEnd::Completed => {}
            RunEnd::Terminated(reason) => return Err(ControlError::Terminated(reason)),
        }

        let position = control.with_core(|core| core.axes_mut().1.actual_position())?;
        info!("Final position: {position}");
        Ok(())
    }

    /// Single exit path after MotorInit.
    fn finish(&self, rig: &mut Rig, result: Result<(), ControlError>) -> Result<(), ControlError> {
        if let Err(e) = &result {
            report_fault(e);
        }
        let Rig {
            bus,
            handle,
            control,
        } = rig;
        control.with_core(|core| {
            let (load, lift) = core.axes_mut();
            safe_shutdown(load, lift, bus.as_mut(), *handle)
        });
        info!("Cycle statistics: {}", control.stats());
        result
    }
}
