//! Error types shared across the benchmark layers
//!
//! Each layer owns a small enum: probing a process ([`ProbeError`]), watching
//! one run ([`MonitorError`]), extracting per-run statistics ([`StatsError`])
//! and the top-level benchmark ([`BenchError`]).

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read one observation from a watched process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// The process no longer exists (already reaped)
    #[error("process {0} no longer exists")]
    Gone(u32),

    /// A single observation failed for another reason
    #[error("observation of process {pid} failed: {reason}")]
    Transient { pid: u32, reason: String },
}

/// Failure of the sampling loop for one run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// No observer could be attached to the process
    #[error("cannot attach to process: {0}")]
    AttachFailure(String),

    /// Too many consecutive observations failed
    #[error("gave up after {0} consecutive failed observations")]
    TooManyErrors(u32),

    /// Cancellation was requested while sampling
    #[error("sampling cancelled")]
    Cancelled,
}

/// Failure to extract statistics from a completed run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatsError {
    #[error("no {0} samples were collected")]
    EmptySeries(&'static str),

    #[error("no cpu times were recorded")]
    MissingCpuTimes,
}

/// Top-level benchmark error.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("no run produced usable statistics")]
    EmptyAggregation,

    #[error("benchmark cancelled")]
    Cancelled,

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid command line: {0}")]
    InvalidCommand(String),

    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signal handler registration failed: {0}")]
    Signal(String),
}

impl BenchError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::Cancelled | BenchError::Monitor(MonitorError::Cancelled) => 130,
            _ => 1,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.exit_code() == 130
    }
}

/// Result alias for benchmark operations.
pub type BenchResult<T> = Result<T, BenchError>;
