//! # Retry Backoff Module
//!
//! Exponential backoff with random jitter for the update polling loop, so a
//! flapping connection to the chat platform does not turn into a tight
//! retry loop.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay generator for consecutive failures
///
/// The n-th consecutive failure waits `base * 2^n` milliseconds, capped at
/// `max_delay_ms`, plus up to `jitter_ms` of random jitter. A success resets
/// the sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Consecutive failures recorded so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record a failure and return how long to wait before retrying
    pub fn next_delay(&mut self) -> Duration {
        let exponential = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << self.attempt.min(16));
        let capped = exponential.min(self.config.max_delay_ms);
        self.attempt = self.attempt.saturating_add(1);

        let jitter = if self.config.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }

    /// Record a success
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
