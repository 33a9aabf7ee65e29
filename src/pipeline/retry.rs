// rams-document-service/src/pipeline/retry.rs

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Automatic retries after the initial attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

pub trait BackoffPolicy {
    /// Delay before the attempt following failed attempt `attempt` (1-based),
    /// or `None` once retries are exhausted.
    fn delay_after_attempt(&self, attempt: u32) -> Option<Duration>;
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl BackoffPolicy for RetryPolicy {
    fn delay_after_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}
