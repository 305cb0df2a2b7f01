//! Bounded retry and backoff for uplift.
//!
//! Uploads and CDN invalidations are idempotent, so transient failures
//! are retried with capped exponential backoff. Everything else in the
//! pipeline is attempted exactly once.
//!
//! # Example
//!
//! ```
//! use uplift_retry::{RetryConfig, delay_for_attempt};
//! use std::time::Duration;
//!
//! let config = RetryConfig::default();
//! assert_eq!(delay_for_attempt(&config, 1), Duration::from_secs(2));
//! assert_eq!(delay_for_attempt(&config, 2), Duration::from_secs(4));
//! ```

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Retry configuration for idempotent network operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for backoff calculations.
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,
    /// Cap applied to the computed delay.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    /// A config that disables retries entirely.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Delay before retrying after `attempt` (1-indexed) failed attempts.
/// Doubles per attempt, capped at `max_delay`.
pub fn delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let pow = attempt.saturating_sub(1).min(16);
    let delay = config.base_delay.saturating_mul(2_u32.saturating_pow(pow));
    delay.min(config.max_delay)
}

/// Run `op` up to `max_attempts` times, sleeping between attempts.
/// Returns the first success or the last error.
pub fn run<T>(config: &RetryConfig, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < attempts {
                    std::thread::sleep(delay_for_attempt(config, attempt));
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err
        .map(|e| e.context(format!("giving up after {attempts} attempts")))
        .unwrap_or_else(|| anyhow::anyhow!("retry loop ran zero attempts")))
}
