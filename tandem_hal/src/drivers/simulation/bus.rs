//! Simulated field bus.
//!
//! `SimBus` implements [`FieldBus`] without hardware: axes are created on
//! first `init_axis()` with per-name presets, and a [`SimProbe`] taken
//! before the bus is boxed gives tests access to every axis afterwards.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use tandem_common::drive::driver::{AxisDriver, DriveError, FieldBus};
use tandem_common::drive::event::{DriveEvent, DriveEventHandler};
use tandem_common::drive::types::{BusKind, ConnectionHandle};

use super::axis::{SimAxis, SimAxisConfig, SimAxisHandle};
use super::clock::SimClock;

#[derive(Default)]
struct BusShared {
    handle: Option<ConnectionHandle>,
    closed: bool,
    refuse_connect: bool,
    handler: Option<Arc<dyn DriveEventHandler>>,
    presets: HashMap<String, SimAxisConfig>,
    axes: Vec<SimAxisHandle>,
    next_handle: u32,
}

/// Simulation bus implementing the FieldBus trait.
pub struct SimBus {
    name: &'static str,
    version: &'static str,
    kind: BusKind,
    clock: SimClock,
    shared: Arc<Mutex<BusShared>>,
}

impl SimBus {
    /// Create a CAN-flavoured bus on a real-time clock.
    pub fn new() -> Self {
        Self::with_clock(SimClock::realtime())
    }

    /// Create a CAN-flavoured bus on the given clock.
    pub fn with_clock(clock: SimClock) -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            kind: BusKind::Can,
            clock,
            shared: Arc::new(Mutex::new(BusShared::default())),
        }
    }

    /// Report a different bus flavour.
    pub fn with_kind(mut self, kind: BusKind) -> Self {
        self.kind = kind;
        self
    }

    /// Configure the drive that `init_axis(name)` will create.
    pub fn preset(self, name: &str, config: SimAxisConfig) -> Self {
        self.shared.lock().presets.insert(name.to_string(), config);
        self
    }

    /// Make every `connect()` fail.
    pub fn refuse_connect(self) -> Self {
        self.shared.lock().refuse_connect = true;
        self
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Inspection handle that outlives boxing the bus.
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldBus for SimBus {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn connect(
        &mut self,
        timeout: Duration,
        events: Arc<dyn DriveEventHandler>,
    ) -> Result<ConnectionHandle, DriveError> {
        let mut shared = self.shared.lock();
        if shared.refuse_connect {
            return Err(DriveError::Connection(format!(
                "simulation bus refused connection (timeout {timeout:?})"
            )));
        }
        shared.next_handle += 1;
        let handle = ConnectionHandle(shared.next_handle);
        shared.handle = Some(handle);
        shared.closed = false;
        shared.handler = Some(events);
        info!("Simulation bus connected ({:?}, handle {})", self.kind, handle.0);
        Ok(handle)
    }

    fn bus_kind(&self) -> BusKind {
        self.kind
    }

    fn init_axis(
        &mut self,
        name: &str,
        handle: ConnectionHandle,
    ) -> Result<Box<dyn AxisDriver>, DriveError> {
        let mut shared = self.shared.lock();
        if shared.handle != Some(handle) {
            return Err(DriveError::Connection(format!(
                "invalid connection handle {}",
                handle.0
            )));
        }
        let config = shared.presets.get(name).cloned().unwrap_or_default();
        let axis_ref = u16::try_from(shared.axes.len())
            .map_err(|_| DriveError::Other("too many simulated axes".to_string()))?;
        let (axis, probe) = SimAxis::new(
            name,
            axis_ref,
            config,
            self.clock.clone(),
            shared.handler.clone(),
        );
        shared.axes.push(probe);
        debug!("Simulated axis '{name}' initialised as ref {axis_ref}");
        Ok(Box::new(axis))
    }

    fn close(&mut self, handle: ConnectionHandle) -> Result<(), DriveError> {
        let mut shared = self.shared.lock();
        if shared.handle == Some(handle) && !shared.closed {
            shared.closed = true;
            shared.handler = None;
            info!("Simulation bus closed");
        }
        Ok(())
    }
}

/// Shared view on a [`SimBus`] for tests and diagnostics.
#[derive(Clone)]
pub struct SimProbe {
    shared: Arc<Mutex<BusShared>>,
}

impl SimProbe {
    /// Handle of the axis initialised under `name`.
    pub fn axis(&self, name: &str) -> Option<SimAxisHandle> {
        self.shared
            .lock()
            .axes
            .iter()
            .find(|a| a.name() == name)
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        let shared = self.shared.lock();
        shared.handle.is_some() && !shared.closed
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Deliver an event through the registered handler.
    pub fn emit(&self, event: DriveEvent) {
        let handler = self.shared.lock().handler.clone();
        if let Some(handler) = handler {
            handler.on_event(&event);
        }
    }
}
