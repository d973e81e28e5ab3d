//! Exponential backoff with jitter between acquisition attempts.

use std::time::Duration;

use rand::Rng;

/// Delay schedule between failed acquisition attempts.
///
/// After failed attempt `n` (zero-based) the caller waits
/// `unit * (base^n + jitter)` with `jitter` drawn uniformly from `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: f64,
    unit: Duration,
}

impl BackoffPolicy {
    /// Creates a policy with the given exponential base and unit.
    pub fn new(base: f64, unit: Duration) -> Self {
        Self { base, unit }
    }

    /// Exponential base.
    pub fn base(&self) -> f64 {
        self.base
    }

    /// Duration of one backoff unit.
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Delay after failed attempt `attempt` with an explicit jitter value.
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub fn delay(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.scale(self.base.powi(exponent) + jitter)
    }

    /// Delay after failed attempt `attempt` with fresh random jitter.
    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.delay(attempt, jitter)
    }

    /// Smallest and largest total wait for `attempts` failed attempts.
    ///
    /// No wait follows the final attempt, so `attempts` attempts sleep
    /// `attempts - 1` times.
    pub fn total_wait_bounds(&self, attempts: u32) -> (Duration, Duration) {
        let sleeps = attempts.saturating_sub(1);
        let mut low = Duration::ZERO;
        let mut high = Duration::ZERO;
        for attempt in 0..sleeps {
            low = low.saturating_add(self.delay(attempt, 0.0));
            high = high.saturating_add(self.delay(attempt, 1.0));
        }
        (low, high)
    }

    fn scale(&self, units: f64) -> Duration {
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * units).unwrap_or(Duration::MAX)
    }
}
