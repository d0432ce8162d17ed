//! Sequential benchmark runner
//!
//! Runs the attempts one after the other so the watcher never competes with
//! the measured process of another attempt.

use tracing::{error, info, warn};

use crate::core::cancel::CancelToken;
use crate::error::{BenchError, BenchResult, MonitorError};
use crate::monitor::{RunSample, RunSampler, SamplerState};

use super::aggregate::RunAggregator;
use super::launcher::Launcher;
use super::report::AggregateReport;

/// What to do across attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    pub runs: usize,
    /// Stop as soon as one attempt cannot be sampled
    pub fail_fast: bool,
    /// Stop when the post-run command exits non-zero
    pub post_fail_fast: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            runs: 1,
            fail_fast: false,
            post_fail_fast: false,
        }
    }
}

/// Drives N attempts of a command and collects their samples
pub struct BenchmarkRunner<L: Launcher> {
    launcher: L,
    sampler: RunSampler,
    policy: RunPolicy,
    cancel: CancelToken,
}

impl<L: Launcher> BenchmarkRunner<L> {
    pub fn new(launcher: L, sampler: RunSampler, policy: RunPolicy, cancel: CancelToken) -> Self {
        Self {
            launcher,
            sampler,
            policy,
            cancel,
        }
    }

    /// Run every attempt and return the samples of the successful ones.
    ///
    /// Only cancellation is an error here; failed attempts are logged and
    /// either skipped or, under a fail-fast policy, end the loop early.
    pub fn run(&mut self) -> BenchResult<Vec<RunSample>> {
        let mut samples = Vec::with_capacity(self.policy.runs);

        for index in 0..self.policy.runs {
            if self.cancel.is_cancelled() {
                return Err(BenchError::Cancelled);
            }
            info!("Run {}/{}", index + 1, self.policy.runs);

            let mut process = match self.launcher.launch(index) {
                Ok(process) => process,
                Err(e) if e.is_cancelled() => return Err(BenchError::Cancelled),
                Err(e) => {
                    error!("Run {}: {} ({:?})", index, e, SamplerState::Error);
                    if self.policy.fail_fast {
                        error!("Run {} could not be sampled. Ending the benchmark", index);
                        break;
                    }
                    continue;
                }
            };

            let mut sample = RunSample::new(index);
            let result = self.sampler.sample(&mut process, &mut sample, &self.cancel);
            self.launcher.finish(index, process, result.is_ok());

            match result {
                Ok(outcome) => info!(
                    "Run {}: {} ticks in {:.2} s ({:?})",
                    index,
                    outcome.ticks,
                    outcome.duration.as_secs_f64(),
                    outcome.state
                ),
                Err(MonitorError::Cancelled) => return Err(BenchError::Cancelled),
                Err(e) => {
                    error!("Run {}: {} ({:?})", index, e, SamplerState::Error);
                    if self.policy.fail_fast {
                        error!("Run {} could not be sampled. Ending the benchmark", index);
                        break;
                    }
                    continue;
                }
            }
            samples.push(sample);

            match self.launcher.post_run(index) {
                Ok(None) | Ok(Some(0)) => {}
                Ok(Some(code)) => {
                    warn!("Run {}: post command returned {}", index, code);
                    if self.policy.post_fail_fast {
                        error!("Post command returned {}. Ending the benchmark", code);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Run {}: post command failed: {}", index, e);
                    if self.policy.post_fail_fast {
                        error!("Post command failed. Ending the benchmark");
                        break;
                    }
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        info!("{} of {} runs sampled", samples.len(), self.policy.runs);
        Ok(samples)
    }

    /// Run every attempt and reduce the samples into a report
    pub fn execute(&mut self, aggregator: RunAggregator) -> BenchResult<AggregateReport> {
        let samples = self.run()?;
        aggregator.aggregate(samples)
    }

    pub fn into_launcher(self) -> L {
        self.launcher
    }
}
