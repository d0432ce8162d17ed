//! Watching one process run to completion
//!
//! - **process**: live OS processes observed through sysinfo (and /proc on Linux)
//! - **scripted**: deterministic fake processes for tests
//! - **sample**: per-run accumulator of observations
//! - **sampler**: the fixed-cadence poll loop

pub mod process;
pub mod sample;
pub mod sampler;
pub mod scripted;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sysinfo::ProcessStatus;

use crate::error::ProbeError;

pub use process::LiveProcess;
pub use sample::RunSample;
pub use sampler::{RunSampler, SampleOutcome, SamplerState};
pub use scripted::{ScriptedProcess, ScriptedTick};

/// Process state representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Running or runnable
    Running,
    /// Sleeping in an interruptible wait
    Sleeping,
    /// Waiting in uninterruptible disk sleep
    DiskSleep,
    /// Zombie (terminated but not reaped)
    Zombie,
    /// Stopped (e.g., by a signal)
    Stopped,
    /// Tracing stop
    TracingStop,
    /// Dead
    Dead,
    /// Idle (kernel thread)
    Idle,
    /// Unknown state
    Unknown,
}

impl ProcessState {
    /// Parse state from /proc/[pid]/stat state character
    pub fn from_stat_char(c: char) -> Self {
        match c {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'Z' => ProcessState::Zombie,
            'T' => ProcessState::Stopped,
            't' => ProcessState::TracingStop,
            'X' | 'x' => ProcessState::Dead,
            'I' => ProcessState::Idle,
            _ => ProcessState::Unknown,
        }
    }

    /// Convert from sysinfo ProcessStatus
    pub fn from_sysinfo(status: ProcessStatus) -> Self {
        match status {
            ProcessStatus::Run => ProcessState::Running,
            ProcessStatus::Sleep => ProcessState::Sleeping,
            ProcessStatus::Idle => ProcessState::Idle,
            ProcessStatus::Zombie => ProcessState::Zombie,
            ProcessStatus::Stop => ProcessState::Stopped,
            ProcessStatus::Tracing => ProcessState::TracingStop,
            ProcessStatus::Dead => ProcessState::Dead,
            ProcessStatus::UninterruptibleDiskSleep => ProcessState::DiskSleep,
            _ => ProcessState::Unknown,
        }
    }

    /// The process has exited but is still observable (not yet reaped)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Zombie | ProcessState::Dead)
    }
}

/// Cumulative CPU time of a process, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
}

/// Everything read from a process during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// CPU usage since the previous observation; may exceed 100 on multi-core load
    pub cpu_percent: f64,
    /// Resident memory relative to total system memory
    pub memory_percent: f64,
    pub cpu_times: CpuTimes,
    /// Only filled when environment capture was requested
    pub environ: Option<BTreeMap<String, String>>,
}

/// A process that can be observed tick by tick.
///
/// Implementations report [`ProbeError::Gone`] once the process has been
/// reaped and [`ProbeError::Transient`] for any other failed read.
pub trait ObservedProcess {
    fn pid(&self) -> u32;

    /// Read one observation. Values are taken together so they describe the same tick.
    fn observe(&mut self, capture_environ: bool) -> Result<Observation, ProbeError>;

    /// Current scheduling state.
    fn state(&mut self) -> Result<ProcessState, ProbeError>;
}

impl<P: ObservedProcess + ?Sized> ObservedProcess for Box<P> {
    fn pid(&self) -> u32 {
        (**self).pid()
    }

    fn observe(&mut self, capture_environ: bool) -> Result<Observation, ProbeError> {
        (**self).observe(capture_environ)
    }

    fn state(&mut self) -> Result<ProcessState, ProbeError> {
        (**self).state()
    }
}

/// Split `KEY=VALUE` environment entries into a map
pub fn parse_environ<I, S>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let (key, value) = entry.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_state_from_char() {
        assert_eq!(ProcessState::from_stat_char('R'), ProcessState::Running);
        assert_eq!(ProcessState::from_stat_char('S'), ProcessState::Sleeping);
        assert_eq!(ProcessState::from_stat_char('Z'), ProcessState::Zombie);
        assert_eq!(ProcessState::from_stat_char('X'), ProcessState::Dead);
        assert_eq!(ProcessState::from_stat_char('?'), ProcessState::Unknown);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessState::Zombie.is_terminal());
        assert!(ProcessState::Dead.is_terminal());
        assert!(!ProcessState::Running.is_terminal());
        assert!(!ProcessState::Stopped.is_terminal());
        assert!(ProcessState::from_sysinfo(ProcessStatus::Zombie).is_terminal());
    }

    #[test]
    fn test_parse_environ() {
        let env = parse_environ(["PATH=/bin:/usr/bin", "EMPTY=", "EQ=a=b", "=hidden", "garbage"]);
        assert_eq!(env.len(), 3);
        assert_eq!(env["PATH"], "/bin:/usr/bin");
        assert_eq!(env["EMPTY"], "");
        assert_eq!(env["EQ"], "a=b");
    }
}
