//! Retry policy for the request client.
//!
//! Kept free of I/O so the decision table can be tested directly.

use std::time::Duration;

use crate::api::Method;
use crate::error::is_retryable_status;

/// How a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    /// A response arrived with this status (or a 2xx with `ok: false`).
    Status(u16),
    /// The transport produced no response.
    NoResponse,
    /// Timer or caller aborted the attempt.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    const STOP: RetryDecision = RetryDecision {
        retry: false,
        delay: Duration::ZERO,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub retries: u32,
    /// Backoff step; attempt `n` waits `delay * n`.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total attempts allowed for `method`.
    pub fn max_attempts(&self, method: Method) -> u32 {
        if method.is_idempotent_read() {
            self.retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, method: Method, attempt: u32, failure: AttemptFailure) -> RetryDecision {
        if attempt >= self.max_attempts(method) {
            return RetryDecision::STOP;
        }

        let transient = match failure {
            AttemptFailure::Status(status) => is_retryable_status(status),
            AttemptFailure::NoResponse => true,
            AttemptFailure::Aborted => false,
        };

        if !transient {
            return RetryDecision::STOP;
        }

        RetryDecision {
            retry: true,
            delay: self.delay.saturating_mul(attempt),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(450))
    }
}
