//! Reconnect backoff policy.
//!
//! Pure and deterministic: jitter is supplied by the caller so that the
//! worst-case bounds can be tested without a random source.

use std::time::Duration;

/// Exponential backoff with a ceiling and additive jitter.
///
/// `delay(attempt) = min(max_ms, base_ms * 2^min(attempt, max_exponent)) + jitter`
/// where `jitter` is reduced into `[0, jitter_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay for the first retry, in milliseconds (default 200).
    pub base_ms: u64,
    /// Ceiling before jitter, in milliseconds (default 5000).
    pub max_ms: u64,
    /// Attempt count beyond which the exponent stops growing (default 5).
    pub max_exponent: u32,
    /// Exclusive upper bound of the additive jitter (default 150).
    pub jitter_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: 200,
            max_ms: 5_000,
            max_exponent: 5,
            jitter_ms: 150,
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnect attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: u32, jitter: u64) -> Duration {
        let exp = attempt.min(self.max_exponent);
        let raw = self.base_ms.saturating_mul(1u64 << exp.min(63));
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            jitter % self.jitter_ms
        };
        Duration::from_millis(raw.min(self.max_ms) + jitter)
    }
}

/// Attempt counter driven by a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay for the current attempt; advances the counter.
    pub fn next_delay(&mut self, jitter: u64) -> Duration {
        let delay = self.policy.delay(self.attempt, jitter);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Called after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }
}
