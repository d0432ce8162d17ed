//! Fixed-cadence poll loop for one run
//!
//! The sampler sleeps one tick, records an observation, then checks whether
//! the process has exited. A zombie (exited, not yet reaped) or a process
//! that has disappeared altogether both end sampling successfully. Failed
//! reads are logged and retried on the next tick.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::core::cancel::CancelToken;
use crate::error::{MonitorError, ProbeError};

use super::{ObservedProcess, RunSample};

/// Default interval between two observations
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// Lifecycle of one sampling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Starting,
    Sampling,
    /// The process exited and was seen in a terminal state
    Terminated,
    /// The process vanished before a terminal state was seen
    NotFound,
    Error,
}

/// Successful end of sampling
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    /// `Terminated` or `NotFound`
    pub state: SamplerState,
    pub ticks: usize,
    pub duration: Duration,
}

/// Drives the poll loop for one process
#[derive(Debug, Clone)]
pub struct RunSampler {
    tick: Duration,
    capture_environ: bool,
    max_consecutive_errors: u32,
}

impl Default for RunSampler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl RunSampler {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            capture_environ: false,
            max_consecutive_errors: 0,
        }
    }

    /// Also capture the environment of the watched process on every tick
    pub fn capture_environ(mut self, capture: bool) -> Self {
        self.capture_environ = capture;
        self
    }

    /// End the run after this many consecutive failed ticks (0 never gives up)
    pub fn max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = limit;
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Sample `process` into `sample` until the process has exited.
    ///
    /// Blocks the calling thread. Returns [`MonitorError::Cancelled`] as soon
    /// as `cancel` is tripped; the partially filled sample should then be dropped.
    pub fn sample<P>(
        &self,
        process: &mut P,
        sample: &mut RunSample,
        cancel: &CancelToken,
    ) -> Result<SampleOutcome, MonitorError>
    where
        P: ObservedProcess + ?Sized,
    {
        let pid = process.pid();
        let run = sample.index();
        debug!("Run {}: sampling process {} every {:?}", run, pid, self.tick);

        let start = Instant::now();
        let mut consecutive_errors = 0u32;

        let state = loop {
            if cancel.is_cancelled() {
                return Err(MonitorError::Cancelled);
            }
            thread::sleep(self.tick);
            if cancel.is_cancelled() {
                return Err(MonitorError::Cancelled);
            }

            let mut tick_failed = false;

            match process.observe(self.capture_environ) {
                Ok(observation) => sample.record(observation),
                Err(ProbeError::Gone(_)) => {
                    info!("Run {}: process {} is gone, sampling stopped", run, pid);
                    break SamplerState::NotFound;
                }
                Err(e) => {
                    warn!("Run {}: {}", run, e);
                    tick_failed = true;
                }
            }

            match process.state() {
                Ok(state) if state.is_terminal() => {
                    info!("Run {}: process {} exited ({:?}), sampling stopped", run, pid, state);
                    break SamplerState::Terminated;
                }
                Ok(_) => {}
                Err(ProbeError::Gone(_)) => {
                    info!("Run {}: process {} is gone, sampling stopped", run, pid);
                    break SamplerState::NotFound;
                }
                Err(e) => {
                    warn!("Run {}: {}", run, e);
                    tick_failed = true;
                }
            }

            if tick_failed {
                consecutive_errors += 1;
                if self.max_consecutive_errors > 0 && consecutive_errors >= self.max_consecutive_errors {
                    sample.set_total_duration(start.elapsed().as_secs_f64());
                    return Err(MonitorError::TooManyErrors(consecutive_errors));
                }
            } else {
                consecutive_errors = 0;
            }
        };

        let duration = start.elapsed();
        sample.set_total_duration(duration.as_secs_f64());

        Ok(SampleOutcome {
            state,
            ticks: sample.tick_count(),
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{ProcessState, ScriptedProcess, ScriptedTick};

    fn sampler() -> RunSampler {
        RunSampler::new(Duration::ZERO)
    }

    #[test]
    fn test_stops_on_zombie() {
        let mut process = ScriptedProcess::steady(10, 4, 80.0, 2.0);
        let mut sample = RunSample::new(0);
        let outcome = sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();

        assert_eq!(outcome.state, SamplerState::Terminated);
        assert_eq!(outcome.ticks, 4);
        assert_eq!(sample.cpu_samples(), &[80.0; 4]);
        assert_eq!(sample.mem_samples().len(), 4);
        assert!(sample.total_duration() >= 0.0);
    }

    #[test]
    fn test_stops_when_process_gone() {
        let script = vec![ScriptedTick::running(10.0, 1.0), ScriptedTick::running(20.0, 1.0)];
        let mut process = ScriptedProcess::new(11, script);
        let mut sample = RunSample::new(0);
        let outcome = sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();

        assert_eq!(outcome.state, SamplerState::NotFound);
        assert_eq!(sample.cpu_samples(), &[10.0, 20.0]);
    }

    #[test]
    fn test_gone_before_first_tick() {
        let mut process = ScriptedProcess::new(12, vec![]);
        let mut sample = RunSample::new(0);
        let outcome = sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();

        assert_eq!(outcome.state, SamplerState::NotFound);
        assert_eq!(outcome.ticks, 0);
        assert!(sample.avg_cpu().is_err());
    }

    #[test]
    fn test_transient_errors_are_skipped() {
        let script = vec![
            ScriptedTick::running(10.0, 1.0),
            ScriptedTick::failing(13, "permission denied"),
            ScriptedTick::failing(13, "permission denied"),
            ScriptedTick::exiting(30.0, 1.0),
        ];
        let mut process = ScriptedProcess::new(13, script);
        let mut sample = RunSample::new(0);
        let outcome = sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();

        assert_eq!(outcome.state, SamplerState::Terminated);
        assert_eq!(sample.cpu_samples(), &[10.0, 30.0]);
        assert_eq!(process.observed(), 4);
    }

    #[test]
    fn test_zombie_detected_even_if_observation_fails() {
        let script = vec![ScriptedTick {
            state: Ok(ProcessState::Zombie),
            ..ScriptedTick::failing(14, "no such file")
        }];
        let mut process = ScriptedProcess::new(14, script);
        let mut sample = RunSample::new(0);
        let outcome = sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();

        assert_eq!(outcome.state, SamplerState::Terminated);
        assert_eq!(outcome.ticks, 0);
    }

    #[test]
    fn test_error_limit() {
        let script = (0..5).map(|_| ScriptedTick::failing(15, "busy")).collect();
        let mut process = ScriptedProcess::new(15, script);
        let mut sample = RunSample::new(0);
        let result = sampler()
            .max_consecutive_errors(3)
            .sample(&mut process, &mut sample, &CancelToken::new());

        assert_eq!(result, Err(MonitorError::TooManyErrors(3)));
        assert_eq!(process.observed(), 3);
    }

    #[test]
    fn test_cancellation_aborts() {
        let mut process = ScriptedProcess::steady(16, 100, 1.0, 1.0);
        let mut sample = RunSample::new(0);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = sampler().sample(&mut process, &mut sample, &cancel);

        assert_eq!(result, Err(MonitorError::Cancelled));
        assert_eq!(process.observed(), 0);
    }

    #[test]
    fn test_captures_environ_when_enabled() {
        let script = vec![
            ScriptedTick::running(1.0, 1.0).with_environ(&[("HOME", "/root")]),
            ScriptedTick::exiting(1.0, 1.0).with_cpu_times(0.5, 0.25),
        ];
        let mut process = ScriptedProcess::new(17, script.clone());
        let mut sample = RunSample::new(0);
        sampler()
            .capture_environ(true)
            .sample(&mut process, &mut sample, &CancelToken::new())
            .unwrap();
        assert_eq!(sample.captured_environ().map(|e| e["HOME"].as_str()), Some("/root"));
        assert_eq!(sample.last_cpu_times().map(|t| t.user), Some(0.5));

        let mut process = ScriptedProcess::new(17, script);
        let mut sample = RunSample::new(1);
        sampler().sample(&mut process, &mut sample, &CancelToken::new()).unwrap();
        assert!(sample.captured_environ().is_none());
    }
}
