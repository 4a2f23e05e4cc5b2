//! Exponential, capped, jittered backoff for throttled providers.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_ms),
            Duration::from_millis(config.max_ms),
        )
    }

    /// Upper bound of the delay before retry number `attempt` (0-based):
    /// `base * 2^attempt`, capped at `max`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before retry number `attempt`: uniformly jittered between half
    /// the ceiling and the ceiling. A server-supplied `Retry-After` raises
    /// the floor but never exceeds `max`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let ceiling = self.ceiling(attempt);
        let floor = ceiling / 2;
        let jittered = if ceiling > floor {
            let span = (ceiling - floor).as_millis() as u64;
            floor + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
        } else {
            ceiling
        };

        match retry_after {
            Some(hint) => jittered.max(hint).min(self.max),
            None => jittered,
        }
    }
}
