//! Deterministic fake processes
//!
//! A [`ScriptedProcess`] replays a fixed list of ticks, which lets the
//! sampler and the benchmark runner be exercised without spawning anything.
//! Once the script runs out the process reports itself gone.

use std::collections::VecDeque;

use crate::error::ProbeError;

use super::{CpuTimes, Observation, ObservedProcess, ProcessState};

/// One scripted poll: what `observe` returns, then what `state` returns
#[derive(Debug, Clone)]
pub struct ScriptedTick {
    pub observation: Result<Observation, ProbeError>,
    pub state: Result<ProcessState, ProbeError>,
}

impl ScriptedTick {
    /// A healthy tick of a running process
    pub fn running(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            observation: Ok(Observation {
                cpu_percent,
                memory_percent,
                cpu_times: CpuTimes::default(),
                environ: None,
            }),
            state: Ok(ProcessState::Running),
        }
    }

    /// The tick on which the process turns into a zombie
    pub fn exiting(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            state: Ok(ProcessState::Zombie),
            ..Self::running(cpu_percent, memory_percent)
        }
    }

    /// A tick whose observation fails transiently
    pub fn failing(pid: u32, reason: &str) -> Self {
        Self {
            observation: Err(ProbeError::Transient { pid, reason: reason.to_string() }),
            state: Ok(ProcessState::Running),
        }
    }

    pub fn with_cpu_times(mut self, user: f64, system: f64) -> Self {
        if let Ok(observation) = self.observation.as_mut() {
            observation.cpu_times = CpuTimes { user, system };
        }
        self
    }

    pub fn with_environ(mut self, pairs: &[(&str, &str)]) -> Self {
        if let Ok(observation) = self.observation.as_mut() {
            observation.environ = Some(
                pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            );
        }
        self
    }
}

/// A fake process driven by a script of ticks
#[derive(Debug, Clone)]
pub struct ScriptedProcess {
    pid: u32,
    ticks: VecDeque<ScriptedTick>,
    current: Option<ScriptedTick>,
    observed: usize,
}

impl ScriptedProcess {
    pub fn new(pid: u32, ticks: Vec<ScriptedTick>) -> Self {
        Self {
            pid,
            ticks: ticks.into(),
            current: None,
            observed: 0,
        }
    }

    /// A process that runs for `ticks` polls at constant load and then exits
    pub fn steady(pid: u32, ticks: usize, cpu_percent: f64, memory_percent: f64) -> Self {
        let mut script: Vec<ScriptedTick> = (1..ticks)
            .map(|_| ScriptedTick::running(cpu_percent, memory_percent))
            .collect();
        if ticks > 0 {
            script.push(ScriptedTick::exiting(cpu_percent, memory_percent));
        }
        Self::new(pid, script)
    }

    /// How many times `observe` was called
    pub fn observed(&self) -> usize {
        self.observed
    }
}

impl ObservedProcess for ScriptedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn observe(&mut self, capture_environ: bool) -> Result<Observation, ProbeError> {
        self.observed += 1;
        self.current = self.ticks.pop_front();
        let tick = self.current.as_ref().ok_or(ProbeError::Gone(self.pid))?;
        let mut observation = tick.observation.clone()?;
        if !capture_environ {
            observation.environ = None;
        }
        Ok(observation)
    }

    fn state(&mut self) -> Result<ProcessState, ProbeError> {
        match &self.current {
            Some(tick) => tick.state.clone(),
            None => Err(ProbeError::Gone(self.pid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_script() {
        let mut process = ScriptedProcess::steady(7, 3, 50.0, 1.0);
        for _ in 0..2 {
            assert!(process.observe(false).is_ok());
            assert_eq!(process.state(), Ok(ProcessState::Running));
        }
        assert!(process.observe(false).is_ok());
        assert_eq!(process.state(), Ok(ProcessState::Zombie));
        assert_eq!(process.observe(false), Err(ProbeError::Gone(7)));
        assert_eq!(process.observed(), 4);
    }

    #[test]
    fn test_environ_only_when_requested() {
        let tick = ScriptedTick::running(1.0, 1.0).with_environ(&[("A", "1")]);
        let mut process = ScriptedProcess::new(1, vec![tick.clone(), tick]);
        assert!(process.observe(false).unwrap().environ.is_none());
        assert_eq!(process.observe(true).unwrap().environ.map(|e| e.len()), Some(1));
    }
}
