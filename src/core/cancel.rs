//! Cancellation of a running benchmark
//!
//! SIGINT and SIGTERM trip a shared flag; the sampling loop and the run loop
//! check it once per tick and unwind with a `Cancelled` error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{BenchError, BenchResult};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token tripped by SIGINT and SIGTERM
    pub fn with_signal_handlers() -> BenchResult<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::flag;

        let token = Self::new();
        flag::register(SIGINT, token.cancelled.clone())
            .map_err(|e| BenchError::Signal(format!("Failed to register SIGINT: {}", e)))?;
        flag::register(SIGTERM, token.cancelled.clone())
            .map_err(|e| BenchError::Signal(format!("Failed to register SIGTERM: {}", e)))?;

        debug!("Cancellation signal handlers registered");
        Ok(token)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
