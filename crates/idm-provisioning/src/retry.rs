//! Next-attempt planning
//!
//! The dispatcher never retries. After a transient failure the executor asks
//! the [`RetryPolicy`] when the operation may run again and records that on
//! the operation; re-submitting it is up to the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Exponential backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts allowed in total, the first one included.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay after `attempts` failed attempts (1-based).
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// When the operation may run again, or `None` once attempts are used up.
    pub fn next_attempt(&self, attempts: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if attempts >= self.max_attempts {
            return None;
        }
        let delay = chrono::Duration::from_std(self.delay_for(attempts)).ok()?;
        now.checked_add_signed(delay)
    }
}
