//! Handle for a held lock.

use std::fmt;
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::error::{LockError, LockResult};
use crate::options::ReleaseMode;
use crate::store::EphemeralStore;

/// Proof of holding a lock.
///
/// Call [`release`](Self::release) to give the lock back and observe any
/// store error. Dropping an unreleased guard inside a tokio runtime spawns the
/// release in the background; outside a runtime the record is left to expire.
pub struct LockGuard<S: EphemeralStore> {
    store: Arc<S>,
    name: String,
    key: String,
    namespace: String,
    token: String,
    release_mode: ReleaseMode,
    released: bool,
}

impl<S: EphemeralStore> LockGuard<S> {
    pub(crate) fn new(
        store: Arc<S>,
        name: String,
        key: String,
        namespace: String,
        token: String,
        release_mode: ReleaseMode,
    ) -> Self {
        Self {
            store,
            name,
            key,
            namespace,
            token,
            release_mode,
            released: false,
        }
    }

    /// Lock name as requested by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the lock record in the store.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store namespace holding the record.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Acquisition token stored in the lock record.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Releases the lock.
    ///
    /// # Errors
    ///
    /// With [`ReleaseMode::Owned`], returns [`LockError::LockLost`] if the
    /// record expired or now belongs to another holder; the other holder's
    /// record is left untouched. Store failures are returned as-is.
    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, namespace = %self.namespace))]
    pub async fn release(mut self) -> LockResult<()> {
        self.released = true;
        release_record(
            &*self.store,
            &self.key,
            &self.token,
            &self.namespace,
            self.release_mode,
        )
        .await
    }
}

async fn release_record<S: EphemeralStore>(
    store: &S,
    key: &str,
    token: &str,
    namespace: &str,
    mode: ReleaseMode,
) -> LockResult<()> {
    match mode {
        ReleaseMode::Owned => {
            if store.delete_if_matches(key, token, namespace).await? {
                Ok(())
            } else {
                Err(LockError::LockLost(format!(
                    "{key} expired or was taken over before release"
                )))
            }
        }
        ReleaseMode::Unconditional => store.delete(key, namespace).await,
    }
}

impl<S: EphemeralStore> Drop for LockGuard<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                lock.name = %self.name,
                lock.key = %self.key,
                "lock guard dropped outside a tokio runtime; record will expire on its own"
            );
            return;
        };

        let store = Arc::clone(&self.store);
        let name = std::mem::take(&mut self.name);
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        let namespace = std::mem::take(&mut self.namespace);
        let mode = self.release_mode;
        runtime.spawn(async move {
            if let Err(e) = release_record(&*store, &key, &token, &namespace, mode).await {
                warn!(lock.name = %name, lock.key = %key, error = %e, "background lock release failed");
            }
        });
    }
}

impl<S: EphemeralStore> fmt::Debug for LockGuard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("namespace", &self.namespace)
            .field("release_mode", &self.release_mode)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
