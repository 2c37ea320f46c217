//! Reconnection Backoff
//!
//! Deterministic exponential backoff for channel reconnection: the delay
//! before retry attempt `n` is `min(initial * 2^n, max)` with no jitter,
//! and a channel gives up after a fixed number of consecutive failures.
//!
//! The absence of jitter means many clients that lost the same gateway
//! reconnect on the same schedule; this mirrors the platform's deployed
//! behavior and is kept deliberately (see DESIGN.md).

use std::time::Duration;

/// Configuration for reconnection backoff.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any retry delay.
    pub max_delay: Duration,
    /// Consecutive failures tolerated before the channel closes for good.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 5,
        }
    }
}

impl BackoffConfig {
    /// Compute the delay for a given attempt number.
    ///
    /// `attempt` is the number of consecutive failures so far (zero-based:
    /// the first retry uses `attempt = 0`). The input is not clamped; the
    /// cap alone bounds the result.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay.as_millis();
        let scaled = if attempt >= 64 {
            u128::MAX
        } else {
            initial.saturating_mul(1u128 << attempt)
        };
        let capped = scaled.min(self.max_delay.as_millis());
        Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX))
    }
}

/// Stateful backoff policy tracking consecutive failures for one channel.
///
/// # Example
///
/// ```rust
/// use observer_stream_mux::infrastructure::gateway::reconnect::{BackoffConfig, BackoffPolicy};
/// use std::time::Duration;
///
/// let mut policy = BackoffPolicy::new(BackoffConfig::default());
///
/// // First failure: retry after the initial delay.
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
///
/// // Connection recovered: start over.
/// policy.reset();
/// assert_eq!(policy.attempt_count(), 0);
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    attempts: u32,
}

impl BackoffPolicy {
    /// Create a policy with zero recorded failures.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Record a failure and get the delay before the next retry.
    ///
    /// Returns `None` once the failure budget is spent; the caller must
    /// stop retrying and close the channel.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.delay_for_attempt(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Reset after a successful connection.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Get the number of consecutive failures recorded so far.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }

    /// Check whether another retry is still permitted.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.attempts < self.config.max_attempts
    }
}
