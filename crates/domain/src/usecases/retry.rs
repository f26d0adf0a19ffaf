//! Bounded retry with exponential backoff

use std::time::Duration;

/// How often and how long to wait before retrying a failed remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
    /// Longest wait accepted, including server-provided retry-after hints
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15 * 60),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, useful in tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), or None to give up
    ///
    /// A server hint longer than `max_delay` means the call cannot succeed
    /// within the budget, so no retry is offered.
    pub fn next_delay(&self, retry: u32, retry_after: Option<Duration>) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            return None;
        }

        match retry_after {
            Some(hint) if hint > self.max_delay => None,
            Some(hint) => Some(hint),
            None => {
                let factor = 2_u32.saturating_pow(retry - 1);
                Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
            }
        }
    }
}
