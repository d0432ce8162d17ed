//! benchmarkish
//!
//! Repeated resource benchmarking of a command: every attempt is launched as
//! a child process, sampled at a fixed cadence for CPU and memory usage until
//! it exits, and the attempts are reduced into plain and trimmed statistics.
//!
//! ## Layers
//!
//! - **stats**: trimmed statistics over sample series
//! - **monitor**: observing one process and accumulating its samples
//! - **bench**: launching attempts, the run loop and the aggregation
//! - **report**: log, JSON and spreadsheet output
//! - **platform**: host specs and formatting helpers
//! - **core**: configuration and cancellation

pub mod bench;
pub mod core;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod report;
pub mod stats;

#[cfg(test)]
mod testing;

// Re-exports
pub use bench::{
    aggregate, AggregateReport, BenchmarkRunner, CommandLauncher, CommandSpec, Launcher, ReportStatistics,
    RunAggregator, RunDetail, RunMetrics, RunPolicy,
};
pub use crate::core::cancel::CancelToken;
pub use crate::core::config::BenchConfig;
pub use error::{BenchError, BenchResult, MonitorError, ProbeError, StatsError};
pub use monitor::{
    CpuTimes, LiveProcess, Observation, ObservedProcess, ProcessState, RunSample, RunSampler, SampleOutcome,
    SamplerState, ScriptedProcess, ScriptedTick,
};
pub use platform::{format_bytes, SystemSpecs};
pub use report::OutputLayout;
