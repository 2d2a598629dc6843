//! Deterministic control cycle: capture → sync → advance → publish.
//!
//! ## Cycle body
//! 1. Re-entrancy check ([`CycleGuard`]); a nested call is skipped.
//! 2. Guard set (RAII token, cleared on every exit path incl. unwinding).
//! 3. Capture: statuses, currents, load position and wall-clock time into a
//!    [`CycleSnapshot`]. Error-stop on either axis is fatal here.
//! 4. Sync: apply pending main-state requests, reset sub-states on change.
//! 5. Advance the lift process, then the load process, from the snapshot.
//! 6. Publish: waypoint marker and telemetry record.
//! 7. Guard cleared.
//!
//! ## Cadence
//! - `Timer`: dedicated thread paced at absolute deadlines
//!   (`clock_nanosleep(TIMER_ABSTIME)` with the `rt` feature). Missed
//!   deadlines are dropped, never queued.
//! - `Polling`: run a cycle, then sleep one period.

use chrono::NaiveTime;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use tandem_common::drive::driver::ERR_ERROR_STOP;
use tandem_common::drive::types::AxisStatus;

use crate::axis::AxisProxy;
use crate::config::Cadence;
use crate::error::ControlError;
use crate::safety::termination::{TerminationLatch, TerminationReason};
use crate::sequence::MotionSequence;
use crate::state::{LiftStep, LoadStep, MainState, ProcessState, lift, load};
use crate::telemetry::{NullSink, TelemetrySample, TelemetrySink};

// ─── Cycle Guard ────────────────────────────────────────────────────

/// Process-wide re-entrancy flag.
#[derive(Debug, Default)]
pub struct CycleGuard {
    active: AtomicBool,
}

/// Held for the duration of one cycle.
#[must_use]
pub struct CycleToken<'a> {
    guard: &'a CycleGuard,
}

impl CycleGuard {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// `None` if a cycle is already running.
    #[inline]
    pub fn try_enter(&self) -> Option<CycleToken<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| CycleToken { guard: self })
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for CycleToken<'_> {
    fn drop(&mut self) {
        self.guard.active.store(false, Ordering::Release);
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSnapshot {
    pub status: AxisStatus,
    pub current_ma: i32,
}

/// Everything the process machines may look at in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleSnapshot {
    pub load: AxisSnapshot,
    pub lift: AxisSnapshot,
    pub load_position: i32,
    /// Process main states after step 4.
    pub lift_main: MainState,
    pub load_main: MainState,
    pub time: NaiveTime,
}

impl CycleSnapshot {
    pub fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            time: self.time,
            load_ma: self.load.current_ma,
            lift_ma: self.lift.current_ma,
            load_position: self.load_position,
        }
    }
}

fn local_time() -> NaiveTime {
    chrono::Local::now().time()
}

// ─── Core ───────────────────────────────────────────────────────────

/// Result of one executed cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub snapshot: CycleSnapshot,
    /// Waypoint issued in this cycle.
    pub waypoint: Option<usize>,
}

/// Both axes, both processes and the waypoint table.
pub struct ControlCore {
    load: AxisProxy,
    lift: AxisProxy,
    lift_process: ProcessState<LiftStep>,
    load_process: ProcessState<LoadStep>,
    table: MotionSequence,
    sink: Box<dyn TelemetrySink>,
    step_timeout: u32,
    clock: fn() -> NaiveTime,
}

impl ControlCore {
    pub fn new(load: AxisProxy, lift: AxisProxy, table: MotionSequence, step_timeout: u32) -> Self {
        Self {
            load,
            lift,
            lift_process: ProcessState::new(),
            load_process: ProcessState::new(),
            table,
            sink: Box::new(NullSink),
            step_timeout,
            clock: local_time,
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = sink;
    }

    /// Replace the wall clock used for telemetry timestamps.
    pub fn set_clock(&mut self, clock: fn() -> NaiveTime) {
        self.clock = clock;
    }

    /// `(load, lift)`.
    pub fn axes_mut(&mut self) -> (&mut AxisProxy, &mut AxisProxy) {
        (&mut self.load, &mut self.lift)
    }

    pub fn lift_process(&self) -> &ProcessState<LiftStep> {
        &self.lift_process
    }

    pub fn load_process(&self) -> &ProcessState<LoadStep> {
        &self.load_process
    }

    pub fn table(&self) -> &MotionSequence {
        &self.table
    }

    /// Trigger both processes; applied in the next cycle.
    pub fn request_run(&mut self) {
        self.lift_process.request(MainState::Running);
        self.load_process.request(MainState::Running);
    }

    /// Both processes idle with nothing pending.
    pub fn is_idle(&self) -> bool {
        self.lift_process.is_idle() && self.load_process.is_idle()
    }

    pub fn rewind(&mut self) {
        self.table.rewind();
    }

    /// Cycle steps 3 to 6.
    pub fn cycle(&mut self) -> Result<CycleReport, ControlError> {
        // 3. capture
        let mut snapshot = self.capture()?;

        // 4. sync
        if self.lift_process.sync() {
            debug!("lift process -> {:?}", self.lift_process.main());
        }
        if self.load_process.sync() {
            debug!("load process -> {:?}", self.load_process.main());
        }
        snapshot.lift_main = self.lift_process.main();
        snapshot.load_main = self.load_process.main();

        // 5. advance
        let waypoint = lift::advance(
            &mut self.lift_process,
            &snapshot,
            &mut self.lift,
            &mut self.table,
            self.step_timeout,
        )?;
        load::advance(
            &mut self.load_process,
            &snapshot,
            &mut self.load,
            self.step_timeout,
        )?;

        // 6. publish
        self.publish(&snapshot, waypoint);

        Ok(CycleReport { snapshot, waypoint })
    }

    fn capture(&mut self) -> Result<CycleSnapshot, ControlError> {
        let load_status = self.load.read_status()?;
        let lift_status = self.lift.read_status()?;
        for (axis, status) in [(&self.load, load_status), (&self.lift, lift_status)] {
            if status.is_error_stop() {
                return Err(ControlError::ErrorStop {
                    axis: axis.name().to_string(),
                    axis_ref: axis.axis_ref(),
                    code: ERR_ERROR_STOP,
                    status: status.bits(),
                });
            }
        }

        let load_ma = self.load.read_current_ma()?;
        let lift_ma = self.lift.read_current_ma()?;
        let load_position = self.load.read_position_register()?;

        Ok(CycleSnapshot {
            load: AxisSnapshot {
                status: load_status,
                current_ma: load_ma,
            },
            lift: AxisSnapshot {
                status: lift_status,
                current_ma: lift_ma,
            },
            load_position,
            lift_main: self.lift_process.main(),
            load_main: self.load_process.main(),
            time: (self.clock)(),
        })
    }

    fn publish(&mut self, snapshot: &CycleSnapshot, waypoint: Option<usize>) {
        let sample = snapshot.sample();
        if let Some(index) = waypoint {
            info!("New motion: waypoint {index} at {}", sample.time.format("%-H:%-M:%-S"));
            if let Err(e) = self.sink.write_line("") {
                warn!("Telemetry marker not sent: {e}");
            }
        }
        trace!("load position {}", sample.load_position);
        if let Err(e) = self.sink.write_line(&sample.to_string()) {
            warn!("Telemetry record not sent: {e}");
        }
    }
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Executed cycles.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub sum_cycle_ns: i64,
    /// Cycles longer than the period.
    pub overruns: u64,
    /// Timer deadlines dropped after an overrun.
    pub dropped_ticks: u64,
    /// Re-entrant invocations skipped.
    pub skipped: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            dropped_ticks: 0,
            skipped: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
    }

    #[inline]
    pub fn record_latency(&mut self, latency_ns: i64) {
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = if self.cycle_count == 0 { 0 } else { self.min_cycle_ns };
        write!(
            f,
            "cycles={} min={}us avg={}us max={}us overruns={} dropped={} skipped={} max_latency={}us",
            self.cycle_count,
            min / 1000,
            self.avg_cycle_ns() / 1000,
            self.max_cycle_ns / 1000,
            self.overruns,
            self.dropped_ticks,
            self.skipped,
            self.max_latency_ns / 1000
        )
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Executed(CycleReport),
    /// Another cycle was in progress; nothing was touched.
    Skipped,
}

/// Guarded entry point shared by the scheduler and the session.
pub struct ControlLoop {
    guard: CycleGuard,
    core: Mutex<ControlCore>,
    stats: Mutex<CycleStats>,
    skipped: AtomicU64,
}

impl ControlLoop {
    pub fn new(core: ControlCore) -> Self {
        Self {
            guard: CycleGuard::new(),
            core: Mutex::new(core),
            stats: Mutex::new(CycleStats::new()),
            skipped: AtomicU64::new(0),
        }
    }

    /// Execute one cycle unless one is already running.
    pub fn run_cycle(&self) -> Result<CycleOutcome, ControlError> {
        let Some(_token) = self.guard.try_enter() else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("Cycle already in progress, invocation skipped");
            return Ok(CycleOutcome::Skipped);
        };

        let start = Instant::now();
        let result = self.core.lock().cycle();
        let duration_ns = i64::try_from(start.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.stats.lock().record(duration_ns);

        result.map(CycleOutcome::Executed)
    }

    #[inline]
    pub fn is_cycle_active(&self) -> bool {
        self.guard.is_active()
    }

    /// Run `f` on the core between cycles.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut ControlCore) -> R) -> R {
        f(&mut self.core.lock())
    }

    pub fn core_mut(&mut self) -> &mut ControlCore {
        self.core.get_mut()
    }

    pub fn into_core(self) -> ControlCore {
        self.core.into_inner()
    }

    pub fn request_run(&self) {
        self.with_core(ControlCore::request_run);
    }

    pub fn rewind(&self) {
        self.with_core(ControlCore::rewind);
    }

    pub fn is_idle(&self) -> bool {
        self.with_core(|core| core.is_idle())
    }

    pub fn stats(&self) -> CycleStats {
        let mut stats = self.stats.lock().clone();
        stats.skipped = self.skipped.load(Ordering::Relaxed);
        stats
    }

    fn note_overrun(&self, dropped: u64) {
        let mut stats = self.stats.lock();
        stats.overruns += 1;
        stats.dropped_ticks += dropped;
    }

    fn note_latency(&self, latency_ns: i64) {
        self.stats.lock().record_latency(latency_ns);
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Real-time placement of the cycle thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtSettings {
    pub cpu_core: usize,
    pub priority: i32,
}

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), ControlError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| ControlError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), ControlError> {
    Ok(())
}

/// Touch 256 KiB of stack so the cycle never page-faults on it.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), ControlError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| ControlError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| ControlError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), ControlError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), ControlError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param for the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(ControlError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), ControlError> {
    Ok(())
}

/// Lock memory, prefault the stack, pin and prioritise the calling thread.
///
/// All steps are no-ops without the `rt` feature.
pub fn rt_setup(settings: RtSettings) -> Result<(), ControlError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(settings.cpu_core)?;
    rt_set_scheduler(settings.priority)?;
    debug!(
        "RT setup done (cpu {}, prio {})",
        settings.cpu_core, settings.priority
    );
    Ok(())
}

// ─── Pacing ─────────────────────────────────────────────────────────

/// Outcome of waiting for the next deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Deadlines skipped because they were already in the past.
    pub dropped: u64,
    /// Wake-up delay behind the deadline [ns].
    pub latency_ns: i64,
}

/// Number of whole periods to skip so the deadline lands after `now`.
fn periods_missed(deadline_ns: i64, now_ns: i64, period_ns: i64) -> u64 {
    if now_ns <= deadline_ns || period_ns <= 0 {
        return 0;
    }
    ((now_ns - deadline_ns) / period_ns + 1) as u64
}

/// Absolute-deadline pacer on `CLOCK_MONOTONIC`.
#[cfg(feature = "rt")]
pub struct Pacer {
    period_ns: i64,
    next: nix::sys::time::TimeSpec,
}

#[cfg(feature = "rt")]
impl Pacer {
    pub fn start(period: Duration) -> Result<Self, ControlError> {
        Ok(Self {
            period_ns: i64::try_from(period.as_nanos()).unwrap_or(i64::MAX),
            next: monotonic_now()?,
        })
    }

    pub fn wait(&mut self) -> Result<Tick, ControlError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_nanosleep};

        self.next = timespec_add_ns(self.next, self.period_ns);
        let now = monotonic_now()?;
        let dropped = periods_missed(
            timespec_to_ns(&self.next),
            timespec_to_ns(&now),
            self.period_ns,
        );
        if dropped > 0 {
            self.next = timespec_add_ns(self.next, self.period_ns * dropped as i64);
        }
        // EINTR only shortens the sleep; the latency below shows it.
        let _ = clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::TIMER_ABSTIME,
            &self.next,
        );
        let woke = monotonic_now()?;
        Ok(Tick {
            dropped,
            latency_ns: timespec_diff_ns(&woke, &self.next).max(0),
        })
    }
}

#[cfg(feature = "rt")]
fn monotonic_now() -> Result<nix::sys::time::TimeSpec, ControlError> {
    nix::time::clock_gettime(nix::time::ClockId::CLOCK_MONOTONIC)
        .map_err(|e| ControlError::RtSetup(format!("clock_gettime: {e}")))
}

/// Deadline pacer on `Instant` (simulation / non-RT hosts).
#[cfg(not(feature = "rt"))]
pub struct Pacer {
    period: Duration,
    origin: Instant,
    next: Instant,
}

#[cfg(not(feature = "rt"))]
impl Pacer {
    pub fn start(period: Duration) -> Result<Self, ControlError> {
        let now = Instant::now();
        Ok(Self {
            period,
            origin: now,
            next: now,
        })
    }

    pub fn wait(&mut self) -> Result<Tick, ControlError> {
        let period_ns = i64::try_from(self.period.as_nanos()).unwrap_or(i64::MAX);
        self.next += self.period;
        let now = Instant::now();
        let dropped = periods_missed(
            self.offset_ns(self.next),
            self.offset_ns(now),
            period_ns,
        );
        if dropped > 0 {
            self.next += self.period * u32::try_from(dropped).unwrap_or(u32::MAX);
        }
        if let Some(remaining) = self.next.checked_duration_since(Instant::now()) {
            thread::sleep(remaining);
        }
        let latency = Instant::now().saturating_duration_since(self.next);
        Ok(Tick {
            dropped,
            latency_ns: i64::try_from(latency.as_nanos()).unwrap_or(i64::MAX),
        })
    }

    fn offset_ns(&self, t: Instant) -> i64 {
        i64::try_from(t.saturating_duration_since(self.origin).as_nanos()).unwrap_or(i64::MAX)
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Both processes back to `Idle`.
    Completed,
    Terminated(TerminationReason),
}

/// Drives [`ControlLoop::run_cycle`] at the sample period.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    cadence: Cadence,
    period: Duration,
    rt: Option<RtSettings>,
}

impl Scheduler {
    pub fn new(cadence: Cadence, period: Duration) -> Self {
        Self {
            cadence,
            period,
            rt: None,
        }
    }

    pub fn with_rt(mut self, settings: RtSettings) -> Self {
        self.rt = Some(settings);
        self
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run cycles until both processes are idle, the latch is set, or a
    /// cycle fails. The latch is checked before every cycle.
    pub fn run(
        &self,
        control: &ControlLoop,
        latch: &TerminationLatch,
    ) -> Result<RunEnd, ControlError> {
        debug!("Scheduler: {:?} cadence, period {:?}", self.cadence, self.period);
        match self.cadence {
            Cadence::Timer => self.run_timer(control, latch),
            Cadence::Polling => {
                if let Some(rt) = self.rt {
                    rt_setup(rt)?;
                }
                self.run_polling(control, latch)
            }
        }
    }

    fn check(control: &ControlLoop, latch: &TerminationLatch) -> Option<RunEnd> {
        if let Some(reason) = latch.reason() {
            return Some(RunEnd::Terminated(reason));
        }
        control.is_idle().then_some(RunEnd::Completed)
    }

    fn run_polling(
        &self,
        control: &ControlLoop,
        latch: &TerminationLatch,
    ) -> Result<RunEnd, ControlError> {
        loop {
            if let Some(end) = Self::check(control, latch) {
                return Ok(end);
            }
            control.run_cycle()?;
            thread::sleep(self.period);
        }
    }

    fn run_timer(
        &self,
        control: &ControlLoop,
        latch: &TerminationLatch,
    ) -> Result<RunEnd, ControlError> {
        let period_ns = i64::try_from(self.period.as_nanos()).unwrap_or(i64::MAX);
        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("tandem-cycle".to_string())
                .spawn_scoped(scope, || -> Result<RunEnd, ControlError> {
                    if let Some(rt) = self.rt {
                        rt_setup(rt)?;
                    }
                    let mut pacer = Pacer::start(self.period)?;
                    loop {
                        if let Some(end) = Self::check(control, latch) {
                            return Ok(end);
                        }
                        let start = Instant::now();
                        control.run_cycle()?;
                        let elapsed = i64::try_from(start.elapsed().as_nanos()).unwrap_or(i64::MAX);

                        let tick = pacer.wait()?;
                        control.note_latency(tick.latency_ns);
                        if elapsed > period_ns || tick.dropped > 0 {
                            control.note_overrun(tick.dropped);
                            warn!(
                                "Cycle overrun: {}us > {}us, {} tick(s) dropped",
                                elapsed / 1000,
                                period_ns / 1000,
                                tick.dropped
                            );
                        }
                    }
                })
                .map_err(|e| ControlError::RtSetup(format!("spawn cycle thread: {e}")))?;

            worker
                .join()
                .map_err(|payload| ControlError::CyclePanic(panic_message(payload.as_ref())))?
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = timespec_to_ns(&ts).saturating_add(ns);
    TimeSpec::new(total / 1_000_000_000, total % 1_000_000_000)
}

#[cfg(feature = "rt")]
fn timespec_to_ns(ts: &nix::sys::time::TimeSpec) -> i64 {
    ts.tv_sec() * 1_000_000_000 + ts.tv_nsec()
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    timespec_to_ns(a) - timespec_to_ns(b)
}

// ─── Tests ──────────────────────────────────────────────────────────
