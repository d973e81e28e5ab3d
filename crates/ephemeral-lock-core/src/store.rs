//! Store adapter contract.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LockResult;

/// A shared key-value store with per-entry expiry.
///
/// This is the only thing the lock coordinator needs from the outside world.
/// Every process taking part in locking must talk to the same store; the
/// existence of an entry under a given key *is* the lock.
///
/// # Example
///
/// ```rust,ignore
/// let created = store
///     .create_if_absent("order:42", "token", Duration::from_secs(600), "mutex")
///     .await?;
/// if created {
///     // we own "order:42" until we delete it or the TTL runs out
/// }
/// ```
pub trait EphemeralStore: Send + Sync + 'static {
    /// Atomically creates `key` in `namespace` holding `value` for `ttl`.
    ///
    /// Returns `Ok(true)` iff this call created the entry. An existing,
    /// unexpired entry leaves the store unchanged and yields `Ok(false)`.
    fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Deletes `key` from `namespace`.
    ///
    /// Idempotent: deleting an absent key is not an error.
    fn delete(&self, key: &str, namespace: &str) -> impl Future<Output = LockResult<()>> + Send;

    /// Atomically deletes `key` only if it currently holds `value`.
    ///
    /// Returns `Ok(true)` if the entry was removed.
    fn delete_if_matches(
        &self,
        key: &str,
        value: &str,
        namespace: &str,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Longest key the store accepts, if it has a limit.
    fn max_key_length(&self) -> Option<usize> {
        None
    }
}

impl<S: EphemeralStore> EphemeralStore for Arc<S> {
    fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> impl Future<Output = LockResult<bool>> + Send {
        (**self).create_if_absent(key, value, ttl, namespace)
    }

    fn delete(&self, key: &str, namespace: &str) -> impl Future<Output = LockResult<()>> + Send {
        (**self).delete(key, namespace)
    }

    fn delete_if_matches(
        &self,
        key: &str,
        value: &str,
        namespace: &str,
    ) -> impl Future<Output = LockResult<bool>> + Send {
        (**self).delete_if_matches(key, value, namespace)
    }

    fn max_key_length(&self) -> Option<usize> {
        (**self).max_key_length()
    }
}
