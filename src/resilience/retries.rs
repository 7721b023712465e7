//! Retry bookkeeping for one logical call.
//!
//! # Responsibilities
//! - Hold the retry limit and initial delay a call runs with
//! - Count retries and hand out the next backoff delay
//!
//! Unauthorized responses never touch this state; only transient failures
//! consume retry budget.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Retry knobs shared by every call a client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub jitter_percent: u8,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            jitter_percent: 0,
        }
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            jitter_percent: config.jitter_percent,
        }
    }
}

/// Per-call retry state. Owned by exactly one call, never shared.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt_count: u32,
    current_delay: Duration,
    max_retries: u32,
    initial_delay: Duration,
    jitter_percent: u8,
}

impl RetryState {
    pub fn new(settings: RetrySettings) -> Self {
        Self {
            attempt_count: 0,
            current_delay: settings.initial_delay,
            max_retries: settings.max_retries,
            initial_delay: settings.initial_delay,
            jitter_percent: settings.jitter_percent,
        }
    }

    /// Retries taken so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay the next retry would wait, before jitter.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_retries
    }

    /// Consume one retry and return how long to wait before it.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count += 1;
        let delay = calculate_backoff(self.attempt_count, self.initial_delay);
        self.current_delay = calculate_backoff(self.attempt_count + 1, self.initial_delay);
        apply_jitter(delay, self.jitter_percent)
    }
}
