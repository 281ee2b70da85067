//! Exponential backoff with jitter
//!
//! The delay before retry `n` (0-based) is `initial * 2^n + uniform(0, jitter)`.
//! Doubling saturates instead of wrapping and is optionally capped.

use rand::Rng;
use std::time::Duration;

/// Backoff parameters for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry, before jitter
    pub initial: Duration,
    /// Upper bound of the uniform jitter added to every delay
    pub jitter: Duration,
    /// Optional cap on the doubled delay (jitter is added on top)
    pub max: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            jitter: Duration::from_secs(1),
            max: None,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy without a cap
    pub fn new(initial: Duration, jitter: Duration) -> Self {
        Self {
            initial,
            jitter,
            max: None,
        }
    }

    /// Cap the doubled delay
    #[must_use]
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = Some(max);
        self
    }

    /// Delay for retry `step` without jitter
    pub fn base_delay(&self, step: u32) -> Duration {
        let factor = 2u32.saturating_pow(step);
        let delay = self.initial.saturating_mul(factor);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Delay for retry `step` with jitter drawn from `rng`
    pub fn delay<R: Rng + ?Sized>(&self, step: u32, rng: &mut R) -> Duration {
        let jitter = self.jitter.mul_f64(rng.gen::<f64>());
        self.base_delay(step).saturating_add(jitter)
    }

    /// Start a fresh backoff sequence for one call
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: *self,
            step: 0,
        }
    }
}

/// Backoff state for a single fetch call
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    step: u32,
}

impl Backoff {
    /// Next delay; each call doubles the base for the following one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay(self.step, &mut rand::thread_rng());
        self.step = self.step.saturating_add(1);
        delay
    }

    /// Number of delays handed out so far
    pub fn steps(&self) -> u32 {
        self.step
    }
}
