//! Linear backoff with a capped multiplier

use std::time::Duration;

use contracts::RetryConfig;

/// Consecutive-failure tracker for the message at the head of the queue
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Delay after `failures` consecutive failures: `min(failures, cap) * base`
    pub fn delay_for(config: &RetryConfig, failures: u32) -> Duration {
        config
            .base_delay
            .saturating_mul(failures.min(config.max_multiplier))
    }

    /// Register a failure and return how long to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        if self.failures < self.config.max_multiplier {
            self.failures += 1;
        }
        Self::delay_for(&self.config, self.failures)
    }

    /// Clear the counter after a successful send
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Current (capped) failure count
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
