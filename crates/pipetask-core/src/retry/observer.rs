//! Retry attempt observation

use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receives events while a [`RetryExecutor`](super::RetryExecutor) runs
pub trait RetryObserver: Send + Sync {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration);

    fn on_success(&self, attempt: u32, total_duration: Duration);

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display);

    /// Called when the predicate rejects an error
    fn on_non_retryable(&self, attempt: u32, error: &dyn Display) {
        let _ = (attempt, error);
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Display, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Display) {}
}

/// Logs retry events through `tracing`, tagged with an operation name
#[derive(Debug, Clone)]
pub struct TracingObserver {
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        debug!(
            operation = %self.operation,
            "Starting attempt {}/{}", attempt, max_attempts
        );
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Display, delay: Duration) {
        warn!(
            operation = %self.operation,
            "Attempt {} failed: {}. Retrying in {}ms", attempt, error, delay.as_millis()
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            info!(
                operation = %self.operation,
                "Succeeded on attempt {} after {:.2}s", attempt, total_duration.as_secs_f64()
            );
        } else {
            debug!(operation = %self.operation, "Succeeded on first attempt");
        }
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Display) {
        error!(
            operation = %self.operation,
            "Giving up after {} attempts: {}", attempts, final_error
        );
    }

    fn on_non_retryable(&self, attempt: u32, error: &dyn Display) {
        warn!(
            operation = %self.operation,
            "Attempt {} failed with a non-retryable error: {}", attempt, error
        );
    }
}
