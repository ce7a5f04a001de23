//! Retry policy for sitemap fetches.

use crate::error::{ConfigError, FetchError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many times a fetch is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per target, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
    /// Random spread applied to each delay (0.0-1.0).
    pub jitter_factor: f64,
    /// Also retry HTTP 5xx responses. 4xx is never retried.
    pub retry_server_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            retry_server_errors: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that attempts each fetch exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1) as i32;
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exp);
        let capped = base.min(self.max_backoff_ms as f64);

        let jitter_range = capped * self.jitter_factor;
        let with_jitter = if jitter_range > 0.0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }

    /// Whether another attempt should follow `attempts_made` failed ones.
    pub fn should_retry(&self, attempts_made: u32, error: &FetchError) -> bool {
        attempts_made < self.max_attempts && self.is_retryable(error)
    }

    /// Network errors are transient; HTTP errors are permanent unless
    /// `retry_server_errors` covers a 5xx.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        match error {
            FetchError::Network { .. } => true,
            FetchError::Http { status } => self.retry_server_errors && (500..600).contains(status),
            FetchError::BodyTooLarge { .. } => false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(0));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitter(self.jitter_factor));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }
}
