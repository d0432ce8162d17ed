//! Benchmark orchestration
//!
//! - **launcher**: spawning each attempt and its post-run command
//! - **runner**: the sequential run loop with fail-fast policies
//! - **aggregate**: reduction of run samples into one report
//! - **report**: the report types and their labelled values

pub mod aggregate;
pub mod launcher;
pub mod report;
pub mod runner;

pub use aggregate::{aggregate, RunAggregator};
pub use launcher::{split_command, CommandLauncher, CommandSpec, Launcher, SpawnedRun};
pub use report::{AggregateReport, ReportStatistics, RunDetail, RunMetrics, StatValue};
pub use runner::{BenchmarkRunner, RunPolicy};
