//! Timeout tracking for in-flight commands

use parrot_shared::CommandConfig;
use std::time::Duration;
use tokio::time::Instant;

/// What to do with a command that has not reported completion yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Still within its timeout (or it has none)
    Wait,
    /// Timed out with retries left; execute it again
    Retry,
    /// Timed out with no retries left
    GiveUp,
}

/// Per-attempt timeout with a bounded number of retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Option<Duration>,
    max_retries: u32,
}

impl From<&CommandConfig> for RetryPolicy {
    fn from(config: &CommandConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.retries,
        }
    }
}

impl RetryPolicy {
    /// Decide for an attempt (0 = first execution) started at `started_at`
    pub fn evaluate(&self, started_at: Instant, attempt: u32, now: Instant) -> RetryDecision {
        let Some(timeout) = self.timeout else {
            return RetryDecision::Wait;
        };

        if now.saturating_duration_since(started_at) < timeout {
            RetryDecision::Wait
        } else if attempt < self.max_retries {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }
}
