//! Retry policy shared by the feed fetcher and the SMTP mailer.
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between.
///
/// Delays grow exponentially from `base_delay` (1x, 2x, 4x, ...) and are capped
/// at `max_delay`. Attempts are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Policy with no waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` failed.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Sleeps for the delay following `attempt`, skipping zero delays.
    pub async fn wait(&self, attempt: u32) {
        let delay = self.delay_after(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
