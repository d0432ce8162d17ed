//! Per-run accumulator of raw observations

use std::collections::BTreeMap;

use crate::error::StatsError;
use crate::stats;

use super::{CpuTimes, Observation};

/// Memoized trim of one series, valid while no sample is appended
#[derive(Debug, Clone, PartialEq)]
struct TrimCache {
    fraction: f64,
    trimmed: Vec<f64>,
}

/// Observations recorded while watching one run of the command.
#[derive(Debug, Clone)]
pub struct RunSample {
    index: usize,
    cpu_samples: Vec<f64>,
    mem_samples: Vec<f64>,
    last_cpu_times: Option<CpuTimes>,
    total_duration: f64,
    captured_environ: Option<BTreeMap<String, String>>,
    cpu_trim: Option<TrimCache>,
    mem_trim: Option<TrimCache>,
}

impl RunSample {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            cpu_samples: Vec::new(),
            mem_samples: Vec::new(),
            last_cpu_times: None,
            total_duration: 0.0,
            captured_environ: None,
            cpu_trim: None,
            mem_trim: None,
        }
    }

    /// Append one tick. CPU and memory series always grow together.
    pub fn record(&mut self, observation: Observation) {
        self.cpu_samples.push(observation.cpu_percent);
        self.mem_samples.push(observation.memory_percent);
        self.cpu_trim = None;
        self.mem_trim = None;
        self.last_cpu_times = Some(observation.cpu_times);
        if observation.environ.is_some() {
            self.captured_environ = observation.environ;
        }
    }

    pub fn set_total_duration(&mut self, seconds: f64) {
        self.total_duration = seconds.max(0.0);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tick_count(&self) -> usize {
        self.cpu_samples.len()
    }

    pub fn cpu_samples(&self) -> &[f64] {
        &self.cpu_samples
    }

    pub fn mem_samples(&self) -> &[f64] {
        &self.mem_samples
    }

    pub fn last_cpu_times(&self) -> Option<CpuTimes> {
        self.last_cpu_times
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn captured_environ(&self) -> Option<&BTreeMap<String, String>> {
        self.captured_environ.as_ref()
    }

    /// Hand the captured environment over, leaving none behind
    pub fn take_environ(&mut self) -> Option<BTreeMap<String, String>> {
        self.captured_environ.take()
    }

    pub fn avg_cpu(&self) -> Result<f64, StatsError> {
        stats::mean(&self.cpu_samples).ok_or(StatsError::EmptySeries("cpu"))
    }

    pub fn max_cpu(&self) -> Result<f64, StatsError> {
        stats::max(&self.cpu_samples).ok_or(StatsError::EmptySeries("cpu"))
    }

    pub fn trimmed_avg_cpu(&mut self, fraction: f64) -> Result<f64, StatsError> {
        let trimmed = Self::trimmed(&self.cpu_samples, &mut self.cpu_trim, fraction);
        stats::mean(trimmed).ok_or(StatsError::EmptySeries("cpu"))
    }

    pub fn trimmed_max_cpu(&mut self, fraction: f64) -> Result<f64, StatsError> {
        let trimmed = Self::trimmed(&self.cpu_samples, &mut self.cpu_trim, fraction);
        stats::max(trimmed).ok_or(StatsError::EmptySeries("cpu"))
    }

    pub fn avg_mem(&self) -> Result<f64, StatsError> {
        stats::mean(&self.mem_samples).ok_or(StatsError::EmptySeries("memory"))
    }

    pub fn max_mem(&self) -> Result<f64, StatsError> {
        stats::max(&self.mem_samples).ok_or(StatsError::EmptySeries("memory"))
    }

    pub fn trimmed_avg_mem(&mut self, fraction: f64) -> Result<f64, StatsError> {
        let trimmed = Self::trimmed(&self.mem_samples, &mut self.mem_trim, fraction);
        stats::mean(trimmed).ok_or(StatsError::EmptySeries("memory"))
    }

    pub fn trimmed_max_mem(&mut self, fraction: f64) -> Result<f64, StatsError> {
        let trimmed = Self::trimmed(&self.mem_samples, &mut self.mem_trim, fraction);
        stats::max(trimmed).ok_or(StatsError::EmptySeries("memory"))
    }

    fn trimmed<'a>(series: &[f64], cache: &'a mut Option<TrimCache>, fraction: f64) -> &'a [f64] {
        let fraction = fraction.abs();
        let stale = cache.as_ref().map_or(true, |c| c.fraction != fraction);
        if stale {
            *cache = Some(TrimCache {
                fraction,
                trimmed: stats::trim(series, fraction),
            });
        }
        cache.as_ref().map(|c| c.trimmed.as_slice()).unwrap_or(&[])
    }

    #[cfg(test)]
    fn cached_cpu_fraction(&self) -> Option<f64> {
        self.cpu_trim.as_ref().map(|c| c.fraction)
    }
}
