//! Live OS process observation
//!
//! CPU and memory readings come from sysinfo. On Linux the user/system CPU
//! split and the scheduling state are read from /proc/[pid]/stat through
//! procfs; other platforms report the state through sysinfo and leave the
//! CPU time split at zero.

use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};
use tracing::debug;

use crate::error::{MonitorError, ProbeError};

use super::{parse_environ, CpuTimes, Observation, ObservedProcess, ProcessState};

/// An OS process watched through sysinfo
pub struct LiveProcess {
    pid: u32,
    system: System,
    total_memory: u64,
}

impl LiveProcess {
    /// Attach an observer to `pid`.
    ///
    /// Fails when the id is missing or zero, when total system memory cannot
    /// be read, or when the process cannot be found.
    pub fn attach(pid: Option<u32>) -> Result<Self, MonitorError> {
        let pid = pid
            .filter(|pid| *pid != 0)
            .ok_or_else(|| MonitorError::AttachFailure("missing process id".into()))?;

        let mut system = System::new();
        system.refresh_memory();
        let total_memory = system.total_memory();
        if total_memory == 0 {
            return Err(MonitorError::AttachFailure("total system memory is unknown".into()));
        }

        // Primes the CPU counters so the first tick reports a delta
        if !system.refresh_process(Pid::from_u32(pid)) {
            return Err(MonitorError::AttachFailure(format!("process {} not found", pid)));
        }

        debug!("Attached to process {} ({} bytes of system memory)", pid, total_memory);
        Ok(Self { pid, system, total_memory })
    }

    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }
}

impl ObservedProcess for LiveProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn observe(&mut self, capture_environ: bool) -> Result<Observation, ProbeError> {
        let pid = Pid::from_u32(self.pid);
        let mut refresh = ProcessRefreshKind::new().with_cpu().with_memory();
        if capture_environ {
            // Kept from the first successful read once the process has exited
            refresh = refresh.with_environ(UpdateKind::OnlyIfNotSet);
        }
        if !self.system.refresh_process_specifics(pid, refresh) {
            return Err(ProbeError::Gone(self.pid));
        }
        let process = self.system.process(pid).ok_or(ProbeError::Gone(self.pid))?;

        let cpu_percent = process.cpu_usage() as f64;
        let memory_percent = process.memory() as f64 / self.total_memory as f64 * 100.0;
        // An exited process exposes no environment; keep the last good capture
        let environ = if capture_environ {
            Some(parse_environ(process.environ())).filter(|env| !env.is_empty())
        } else {
            None
        };

        Ok(Observation {
            cpu_percent,
            memory_percent,
            cpu_times: read_cpu_times(self.pid)?,
            environ,
        })
    }

    #[cfg(target_os = "linux")]
    fn state(&mut self) -> Result<ProcessState, ProbeError> {
        let stat = proc_stat(self.pid)?;
        Ok(ProcessState::from_stat_char(stat.state))
    }

    #[cfg(not(target_os = "linux"))]
    fn state(&mut self) -> Result<ProcessState, ProbeError> {
        let pid = Pid::from_u32(self.pid);
        if !self.system.refresh_process_specifics(pid, ProcessRefreshKind::new()) {
            return Err(ProbeError::Gone(self.pid));
        }
        self.system
            .process(pid)
            .map(|p| ProcessState::from_sysinfo(p.status()))
            .ok_or(ProbeError::Gone(self.pid))
    }
}

#[cfg(target_os = "linux")]
fn proc_stat(pid: u32) -> Result<procfs::process::Stat, ProbeError> {
    let into_error = |e: procfs::ProcError| match e {
        procfs::ProcError::NotFound(_) => ProbeError::Gone(pid),
        other => ProbeError::Transient { pid, reason: other.to_string() },
    };
    let process = procfs::process::Process::new(pid as i32).map_err(into_error)?;
    process.stat().map_err(into_error)
}

#[cfg(target_os = "linux")]
fn read_cpu_times(pid: u32) -> Result<CpuTimes, ProbeError> {
    let stat = proc_stat(pid)?;
    let ticks = procfs::ticks_per_second() as f64;
    Ok(CpuTimes {
        user: stat.utime as f64 / ticks,
        system: stat.stime as f64 / ticks,
    })
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_times(_pid: u32) -> Result<CpuTimes, ProbeError> {
    Ok(CpuTimes::default())
}
