//! Reconnect delays for the event stream.

use std::time::Duration;

use rand::Rng;

use crate::config::EventsConfig;

/// Doubling delay per failed attempt, capped, plus up to 10% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    base: Duration,
    max: Duration,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reconnect_base_delay_ms),
            Duration::from_millis(config.reconnect_max_delay_ms),
        )
    }

    /// Upper bound of the delay before `attempt`, without jitter.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let Some(doublings) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let factor = 1u32.checked_shl(doublings.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before reconnect `attempt` (1-based). Attempt 0 is immediate.
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        let spread = ceiling.as_millis() as u64 / 10;
        if spread == 0 {
            return ceiling;
        }
        ceiling + Duration::from_millis(rand::thread_rng().gen_range(0..spread))
    }
}
