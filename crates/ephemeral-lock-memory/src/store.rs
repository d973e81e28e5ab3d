//! TTL key-value store held in process memory.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ephemeral_lock_core::error::LockResult;
use ephemeral_lock_core::store::EphemeralStore;
use tokio::time::Instant;
use tracing::trace;

/// Builder for [`MemoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    max_key_length: Option<usize>,
}

impl MemoryStoreBuilder {
    /// Creates a builder with no key length limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps key length, mimicking stores such as memcache (250 bytes).
    pub fn max_key_length(mut self, max: usize) -> Self {
        self.max_key_length = Some(max);
        self
    }

    /// Builds the store.
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            namespaces: Mutex::new(HashMap::new()),
            max_key_length: self.max_key_length,
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Key-value store with per-entry expiry, local to this process.
///
/// Expiry follows tokio's clock, so paused-time tests can fast-forward it.
/// Expired entries are treated as absent. Each write sweeps the expired
/// entries of its namespace; [`purge_expired`](Self::purge_expired) sweeps
/// every namespace.
#[derive(Debug)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<String, HashMap<String, Entry>>>,
    max_key_length: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store with no key length limit.
    pub fn new() -> Self {
        MemoryStoreBuilder::new().build()
    }

    /// Returns a new builder for configuring the store.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    /// Whether `key` currently holds a live entry in `namespace`.
    pub fn contains(&self, key: &str, namespace: &str) -> bool {
        self.value(key, namespace).is_some()
    }

    /// Value of the live entry under `key`, if any.
    pub fn value(&self, key: &str, namespace: &str) -> Option<String> {
        let now = Instant::now();
        self.namespaces()
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Number of live entries across all namespaces.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.namespaces()
            .values()
            .flat_map(|entries| entries.values())
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut namespaces = self.namespaces();
        let mut removed = 0;
        for entries in namespaces.values_mut() {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            removed += before - entries.len();
        }
        namespaces.retain(|_, entries| !entries.is_empty());
        removed
    }

    fn namespaces(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, Entry>>> {
        // A panic while holding the mutex cannot leave a map half-updated.
        self.namespaces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralStore for MemoryStore {
    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> LockResult<bool> {
        let now = Instant::now();
        let mut namespaces = self.namespaces();
        let entries = namespaces.entry(namespace.to_string()).or_default();

        if entries.get(key).is_some_and(|existing| existing.is_live(now)) {
            return Ok(false);
        }

        // Records of crashed holders would otherwise linger under names
        // nobody takes again.
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        if entries.len() < before {
            trace!(namespace, removed = before - entries.len(), "purged expired entries");
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now.checked_add(ttl).unwrap_or_else(far_future),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str, namespace: &str) -> LockResult<()> {
        if let Some(entries) = self.namespaces().get_mut(namespace) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn delete_if_matches(&self, key: &str, value: &str, namespace: &str) -> LockResult<bool> {
        let now = Instant::now();
        let mut namespaces = self.namespaces();
        let Some(entries) = namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        match entries.get(key) {
            Some(entry) if entry.is_live(now) && entry.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn max_key_length(&self) -> Option<usize> {
        self.max_key_length
    }
}

/// Expiry used when `now + ttl` overflows the clock (roughly 30 years out).
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(60 * 60 * 24 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "mutex";

    #[tokio::test]
    async fn test_create_if_absent_is_exclusive() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent("a", "1", Duration::from_secs(10), NS).await.unwrap());
        assert!(!store.create_if_absent("a", "2", Duration::from_secs(10), NS).await.unwrap());
        assert_eq!(store.value("a", NS).as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent("a", "1", Duration::from_secs(10), "one").await.unwrap());
        assert!(store.create_if_absent("a", "1", Duration::from_secs(10), "two").await.unwrap());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent("a", "1", Duration::from_secs(1), NS).await.unwrap());
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(store.contains("a", NS));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!store.contains("a", NS));
        assert!(store.create_if_absent("a", "2", Duration::from_secs(1), NS).await.unwrap());
        assert_eq!(store.value("a", NS).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete("missing", NS).await.unwrap();
        store.create_if_absent("a", "1", Duration::from_secs(10), NS).await.unwrap();
        store.delete("a", NS).await.unwrap();
        store.delete("a", NS).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_if_matches_checks_value() {
        let store = MemoryStore::new();
        store.create_if_absent("a", "mine", Duration::from_secs(10), NS).await.unwrap();
        assert!(!store.delete_if_matches("a", "theirs", NS).await.unwrap());
        assert!(store.contains("a", NS));
        assert!(store.delete_if_matches("a", "mine", NS).await.unwrap());
        assert!(!store.contains("a", NS));
        assert!(!store.delete_if_matches("a", "mine", NS).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.create_if_absent("short", "1", Duration::from_secs(1), NS).await.unwrap();
        store.create_if_absent("long", "1", Duration::from_secs(60), NS).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries() {
        let store = MemoryStore::new();
        for key in ["crashed-1", "crashed-2", "crashed-3"] {
            store.create_if_absent(key, "1", Duration::from_secs(1), NS).await.unwrap();
        }
        store.create_if_absent("other", "1", Duration::from_secs(1), "elsewhere").await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(store.create_if_absent("fresh", "1", Duration::from_secs(60), NS).await.unwrap());

        let namespaces = store.namespaces();
        assert_eq!(namespaces[NS].len(), 1);
        assert!(namespaces[NS].contains_key("fresh"));
        assert_eq!(namespaces["elsewhere"].len(), 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent("a", "1", Duration::MAX, NS).await.unwrap());
        assert!(store.contains("a", NS));
    }

    #[test]
    fn test_builder_sets_key_limit() {
        assert_eq!(MemoryStore::new().max_key_length(), None);
        assert_eq!(MemoryStore::builder().max_key_length(250).build().max_key_length(), Some(250));
    }
}
