//! Fixed-backoff retry policy for transient RPC failures.

use std::time::Duration;

/// Stateless retry policy — computes the delay before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the first try). `None` = retry forever.
    pub max_retries: Option<u32>,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unlimited(Duration::from_secs(15))
    }
}

impl RetryPolicy {
    /// Retry forever, waiting `backoff` between attempts.
    pub fn unlimited(backoff: Duration) -> Self {
        Self {
            max_retries: None,
            backoff,
        }
    }

    pub fn bounded(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries: Some(max_retries),
            backoff,
        }
    }

    /// Retry forever with no delay. For tests.
    pub fn immediate() -> Self {
        Self::unlimited(Duration::ZERO)
    }

    /// Returns the delay before the `attempt`-th retry (1-based), or `None`
    /// once retries are exhausted.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.should_retry(attempt).then_some(self.backoff)
    }

    /// Returns `true` if any retries remain after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_retries {
            Some(max) => attempt <= max,
            None => true,
        }
    }
}
