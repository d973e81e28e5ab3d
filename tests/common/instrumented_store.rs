//! Store wrappers that observe or disturb the traffic reaching a real store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ephemeral_lock::{EphemeralStore, LockError, LockResult, MemoryStore};

/// Memory store that counts the calls it receives.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    creates: AtomicU32,
    deletes: AtomicU32,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_if_absent` calls.
    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of delete calls of either kind.
    pub fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.creates.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }
}

impl EphemeralStore for CountingStore {
    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> LockResult<bool> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_if_absent(key, value, ttl, namespace).await
    }

    async fn delete(&self, key: &str, namespace: &str) -> LockResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key, namespace).await
    }

    async fn delete_if_matches(&self, key: &str, value: &str, namespace: &str) -> LockResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_if_matches(key, value, namespace).await
    }
}

/// Memory store whose first `failures` writes fail with a connection error.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures_left: AtomicU32,
    creates: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(failures),
            creates: AtomicU32::new(0),
        }
    }

    /// A store that never accepts a write.
    pub fn unreachable() -> Self {
        Self::new(u32::MAX)
    }

    /// Makes the next `failures` writes fail.
    pub fn fail_next(&self, failures: u32) {
        self.failures_left.store(failures, Ordering::SeqCst);
    }

    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
}

impl EphemeralStore for FlakyStore {
    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        namespace: &str,
    ) -> LockResult<bool> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LockError::Connection(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "store unreachable",
            ))));
        }
        self.inner.create_if_absent(key, value, ttl, namespace).await
    }

    async fn delete(&self, key: &str, namespace: &str) -> LockResult<()> {
        self.inner.delete(key, namespace).await
    }

    async fn delete_if_matches(&self, key: &str, value: &str, namespace: &str) -> LockResult<bool> {
        self.inner.delete_if_matches(key, value, namespace).await
    }
}
