//! Reduction of completed runs into one report
//!
//! Runs whose statistics cannot be extracted (no ticks recorded, no CPU
//! times) are logged and left out. Aggregation only fails when no run at all
//! is usable.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{BenchError, BenchResult, StatsError};
use crate::monitor::RunSample;
use crate::stats;

use super::report::{AggregateReport, ReportStatistics, RunDetail, RunMetrics};

/// Combines run samples into an [`AggregateReport`]
#[derive(Debug, Clone)]
pub struct RunAggregator {
    total_memory: u64,
    trim: f64,
    include_details: bool,
    include_environ: bool,
    environ: BTreeMap<String, String>,
}

impl RunAggregator {
    /// `total_memory` is the system memory in bytes used to convert memory percentages
    pub fn new(total_memory: u64, trim: f64) -> Self {
        Self {
            total_memory,
            trim,
            include_details: false,
            include_environ: false,
            environ: BTreeMap::new(),
        }
    }

    pub fn with_details(mut self, include: bool) -> Self {
        self.include_details = include;
        self
    }

    pub fn with_environ(mut self, include: bool) -> Self {
        self.include_environ = include;
        self
    }

    /// Extract the per-run statistics of one sample
    pub fn extract(&self, sample: &mut RunSample) -> Result<RunMetrics, StatsError> {
        let trim = self.trim;
        let avg_cpu = sample.avg_cpu()?;
        let trimmed_avg_cpu = sample.trimmed_avg_cpu(trim)?;
        let max_cpu = sample.max_cpu()?;
        let trimmed_max_cpu = sample.trimmed_max_cpu(trim)?;
        let avg_mem = sample.avg_mem()?;
        let trimmed_avg_mem = sample.trimmed_avg_mem(trim)?;
        let max_mem = sample.max_mem()?;
        let trimmed_max_mem = sample.trimmed_max_mem(trim)?;
        let cpu_times = sample.last_cpu_times().ok_or(StatsError::MissingCpuTimes)?;

        Ok(RunMetrics {
            avg_cpu,
            trimmed_avg_cpu,
            max_cpu,
            trimmed_max_cpu,
            avg_mem: self.to_bytes(avg_mem),
            trimmed_avg_mem: self.to_bytes(trimmed_avg_mem),
            max_mem: self.to_bytes(max_mem),
            trimmed_max_mem: self.to_bytes(trimmed_max_mem),
            user_cpu_time: cpu_times.user,
            system_cpu_time: cpu_times.system,
            duration: sample.total_duration(),
        })
    }

    /// Merge the environment captured by one run; later runs win
    fn merge_environ(&mut self, sample: &mut RunSample) {
        if let Some(environ) = sample.take_environ() {
            self.environ.extend(environ);
        }
    }

    fn to_bytes(&self, percent: f64) -> f64 {
        percent / 100.0 * self.total_memory as f64
    }

    /// Reduce `samples` in run order
    pub fn aggregate(mut self, samples: Vec<RunSample>) -> BenchResult<AggregateReport> {
        let mut details: Vec<RunDetail> = Vec::with_capacity(samples.len());

        for mut sample in samples {
            match self.extract(&mut sample) {
                Ok(metrics) => {
                    debug!("Run {}: {} ticks extracted", sample.index(), sample.tick_count());
                    if self.include_environ {
                        self.merge_environ(&mut sample);
                    }
                    details.push(RunDetail { run: sample.index(), metrics });
                }
                Err(e) => {
                    warn!("Run {}: processing failed ({}), run skipped", sample.index(), e);
                }
            }
        }

        if details.is_empty() {
            return Err(BenchError::EmptyAggregation);
        }

        let column = |f: fn(&RunMetrics) -> f64| -> Vec<f64> { details.iter().map(|d| f(&d.metrics)).collect() };
        let avg = |f: fn(&RunMetrics) -> f64| stats::mean(&column(f)).unwrap_or_default();
        let times = column(|m| m.duration);

        let statistics = ReportStatistics {
            entries: details.len(),
            trim: self.trim,
            avg_cpu: avg(|m| m.avg_cpu),
            trimmed_avg_cpu: avg(|m| m.trimmed_avg_cpu),
            max_cpu: avg(|m| m.max_cpu),
            trimmed_max_cpu: avg(|m| m.trimmed_max_cpu),
            avg_mem: avg(|m| m.avg_mem),
            trimmed_avg_mem: avg(|m| m.trimmed_avg_mem),
            max_mem: avg(|m| m.max_mem),
            trimmed_max_mem: avg(|m| m.trimmed_max_mem),
            user_cpu_time: avg(|m| m.user_cpu_time),
            system_cpu_time: avg(|m| m.system_cpu_time),
            avg_time: stats::mean(&times).unwrap_or_default(),
            max_time: stats::max(&times).unwrap_or_default(),
            min_time: stats::min(&times).unwrap_or_default(),
            median_time: stats::median(&times).unwrap_or_default(),
        };

        if !self.include_details {
            details.clear();
        }

        Ok(AggregateReport {
            statistics,
            details,
            environ: self.environ,
        })
    }
}

/// Aggregate `samples` in one call
pub fn aggregate(
    samples: Vec<RunSample>,
    total_memory: u64,
    trim: f64,
    include_details: bool,
    include_environ: bool,
) -> BenchResult<AggregateReport> {
    RunAggregator::new(total_memory, trim)
        .with_details(include_details)
        .with_environ(include_environ)
        .aggregate(samples)
}
