//! Per-acquisition lock settings.

use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::error::{LockError, LockResult};

/// Default lifetime of a lock record (10 minutes).
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(10 * 60);

/// Default number of acquisition attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default exponential backoff base.
pub const DEFAULT_BACKOFF_BASE: f64 = 2.0;

/// Default unit the backoff and jitter are measured in.
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// How a held lock is given back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseMode {
    /// Delete the record only if it still carries this holder's token.
    #[default]
    Owned,
    /// Delete the record whoever holds it.
    Unconditional,
}

/// Settings for acquiring a single lock.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ephemeral_lock_core::LockOptions;
///
/// let options = LockOptions::new()
///     .expiry(Duration::from_secs(30))
///     .max_retries(3)
///     .backoff_base(2.0);
/// assert_eq!(options.max_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LockOptions {
    /// TTL given to the lock record; bounds how long a crashed holder blocks others.
    pub expiry: Duration,
    /// Number of acquisition attempts before giving up.
    pub max_retries: u32,
    /// Base of the exponential backoff between attempts.
    pub backoff_base: f64,
    /// Duration of one backoff unit.
    pub backoff_unit: Duration,
    /// Release strategy.
    pub release_mode: ReleaseMode,
}

impl LockOptions {
    /// Creates options with the default settings.
    pub fn new() -> Self {
        Self {
            expiry: DEFAULT_EXPIRY,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            release_mode: ReleaseMode::Owned,
        }
    }

    /// Sets the lock record TTL.
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets the number of acquisition attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the exponential backoff base.
    pub fn backoff_base(mut self, base: f64) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the duration of one backoff unit.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Sets the release strategy.
    pub fn release_mode(mut self, mode: ReleaseMode) -> Self {
        self.release_mode = mode;
        self
    }

    /// Checks the options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidOptions`] for a zero expiry or a negative,
    /// NaN or infinite backoff base.
    pub fn validate(&self) -> LockResult<()> {
        if self.expiry.is_zero() {
            return Err(LockError::InvalidOptions(
                "expiry must be greater than zero".to_string(),
            ));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 0.0 {
            return Err(LockError::InvalidOptions(format!(
                "backoff base must be a finite, non-negative number (got {})",
                self.backoff_base
            )));
        }
        Ok(())
    }

    /// Backoff policy described by these options.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.backoff_base, self.backoff_unit)
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self::new()
    }
}
