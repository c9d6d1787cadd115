//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay schedule for repeated store lookups.
///
/// The n-th delay is `base * 2^(n-1)`, capped at `max`, plus up to 10% jitter so
/// that waiters started together do not poll in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            attempt: 0,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
