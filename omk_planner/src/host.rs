//! Host-runner plumbing: RT setup and drift-free cycle pacing.
//!
//! The planner itself is tick-driven and host-agnostic; this module is
//! what the bundled binary uses to call `run_cycle` at a fixed period.
//!
//! ## RT Setup Sequence (`rt` feature)
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` — lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` — pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)` — RT priority.
//!
//! Without the feature every RT call is a no-op and pacing falls back
//! to `std::thread::sleep`, which is plenty for simulation and tests.

use thiserror::Error;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics, updated without allocation.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of budget overruns detected.
    pub overruns: u64,
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
        }
    }

    /// Record one cycle duration against the budget.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average cycle time [ns] (0 before the first cycle).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("RT setup error: {0}")]
    RtSetup(String),
}

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), HostError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| HostError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), HostError> {
    Ok(())
}

/// Prefault stack pages so the cycle never page-faults.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), HostError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| HostError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| HostError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), HostError> {
    Ok(())
}

/// Set SCHED_FIFO at the given priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), HostError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(HostError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), HostError> {
    Ok(())
}

/// Full RT setup sequence; call before entering the cycle loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), HostError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Pacer ────────────────────────────────────────────────────

/// Absolute-time cycle pacing.
///
/// With the `rt` feature this is `clock_nanosleep(TIMER_ABSTIME)` on
/// `CLOCK_MONOTONIC`, which does not drift; otherwise a plain
/// `thread::sleep` against an `Instant` schedule.
#[cfg(feature = "rt")]
pub struct CyclePacer {
    cycle_ns: i64,
    next_wake: nix::sys::time::TimeSpec,
}

#[cfg(feature = "rt")]
impl CyclePacer {
    pub fn new(cycle_ns: i64) -> Result<Self, HostError> {
        use nix::time::{ClockId, clock_gettime};
        let now = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| HostError::RtSetup(format!("clock_gettime: {e}")))?;
        Ok(Self {
            cycle_ns,
            next_wake: now,
        })
    }

    /// Sleep until the next cycle boundary.
    pub fn wait(&mut self) {
        use nix::sys::time::TimeSpec;
        use nix::time::{ClockId, ClockNanosleepFlags, clock_nanosleep};

        let mut secs = self.next_wake.tv_sec();
        let mut nanos = self.next_wake.tv_nsec() + self.cycle_ns;
        while nanos >= 1_000_000_000 {
            secs += 1;
            nanos -= 1_000_000_000;
        }
        self.next_wake = TimeSpec::new(secs, nanos);
        let _ = clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::TIMER_ABSTIME,
            &self.next_wake,
        );
    }
}

#[cfg(not(feature = "rt"))]
pub struct CyclePacer {
    cycle: std::time::Duration,
    next_wake: std::time::Instant,
}

#[cfg(not(feature = "rt"))]
impl CyclePacer {
    pub fn new(cycle_ns: i64) -> Result<Self, HostError> {
        Ok(Self {
            cycle: std::time::Duration::from_nanos(cycle_ns.max(0) as u64),
            next_wake: std::time::Instant::now(),
        })
    }

    /// Sleep until the next cycle boundary (best effort).
    pub fn wait(&mut self) {
        self.next_wake += self.cycle;
        let now = std::time::Instant::now();
        if let Some(remaining) = self.next_wake.checked_duration_since(now) {
            std::thread::sleep(remaining);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
