//! Acquire/retry/release protocol for a single named lock.

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::field::Empty;
use tracing::{Span, debug, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::guard::LockGuard;
use crate::key::to_store_key;
use crate::keygen::generate_key;
use crate::options::LockOptions;
use crate::store::EphemeralStore;

/// A named lock backed by an [`EphemeralStore`].
///
/// Creating the lock touches nothing; the store is only contacted by the
/// acquire methods. Locks are cheap to create and may be created anew for
/// every use.
///
/// # Example
///
/// ```rust,ignore
/// let lock = provider.create_lock("order:42")?;
/// let total = lock.run(|| async { recompute_totals().await }).await?;
/// ```
pub struct EphemeralLock<S: EphemeralStore> {
    store: Arc<S>,
    name: String,
    key: String,
    namespace: String,
    options: LockOptions,
}

impl<S: EphemeralStore> EphemeralLock<S> {
    pub(crate) fn new(
        store: Arc<S>,
        name: &str,
        namespace: &str,
        options: LockOptions,
    ) -> LockResult<Self> {
        let key = to_store_key(name, store.max_key_length())?;
        Ok(Self {
            store,
            name: name.to_string(),
            key,
            namespace: namespace.to_string(),
            options,
        })
    }

    /// Lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the lock record in the store.
    pub fn store_key(&self) -> &str {
        &self.key
    }

    /// Store namespace holding the record.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Settings used by the acquire methods.
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Replaces the acquisition settings.
    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    /// Makes a single acquisition attempt.
    ///
    /// Returns `Ok(None)` if the lock is currently held.
    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, namespace = %self.namespace, acquired = Empty))]
    pub async fn try_acquire(&self) -> LockResult<Option<LockGuard<S>>> {
        self.options.validate()?;
        let guard = self.attempt().await?;
        Span::current().record("acquired", guard.is_some());
        Ok(guard)
    }

    /// Acquires the lock, retrying with exponential backoff.
    ///
    /// Makes at most `max_retries` attempts, sleeping
    /// `backoff_base^attempt + jitter` backoff units between them.
    ///
    /// # Errors
    ///
    /// * [`LockError::LockUnavailable`] - the lock stayed held.
    /// * [`LockError::StoreUnavailable`] - every attempt failed on a store error.
    /// * [`LockError::InvalidOptions`] - the options are out of range.
    pub async fn acquire(&self) -> LockResult<LockGuard<S>> {
        self.acquire_inner(None).await
    }

    /// Like [`acquire`](Self::acquire), but gives up with
    /// [`LockError::Cancelled`] as soon as `cancel` reads `true`.
    pub async fn acquire_cancellable(
        &self,
        mut cancel: watch::Receiver<bool>,
    ) -> LockResult<LockGuard<S>> {
        self.acquire_inner(Some(&mut cancel)).await
    }

    /// Runs `action` while holding the lock.
    ///
    /// The lock is released however `action` finishes. The action's output is
    /// returned as-is; a failed release is logged and does not replace it.
    /// If `action` panics, the lock is released before the panic resumes.
    #[instrument(skip_all, fields(lock.name = %self.name, lock.key = %self.key, namespace = %self.namespace))]
    pub async fn run<F, Fut, T>(&self, action: F) -> LockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.acquire().await?;
        let outcome = AssertUnwindSafe(async move { action().await })
            .catch_unwind()
            .await;
        if let Err(e) = guard.release().await {
            warn!(error = %e, "failed to release lock after protected action");
        }
        match outcome {
            Ok(output) => Ok(output),
            Err(payload) => {
                warn!("protected action panicked");
                resume_unwind(payload)
            }
        }
    }

    #[instrument(
        skip(self, cancel),
        fields(
            lock.name = %self.name,
            lock.key = %self.key,
            namespace = %self.namespace,
            max_retries = self.options.max_retries,
            acquired = Empty,
            attempts = Empty,
            elapsed_ms = Empty,
        )
    )]
    async fn acquire_inner(
        &self,
        mut cancel: Option<&mut watch::Receiver<bool>>,
    ) -> LockResult<LockGuard<S>> {
        self.options.validate()?;

        let start = Instant::now();
        let backoff = self.options.backoff();
        let max_retries = self.options.max_retries;
        let mut contended = false;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if cancel.as_deref().is_some_and(|c| *c.borrow()) {
                return Err(LockError::Cancelled);
            }

            match self.attempt().await {
                Ok(Some(guard)) => {
                    let span = Span::current();
                    span.record("acquired", true);
                    span.record("attempts", attempt + 1);
                    span.record("elapsed_ms", start.elapsed().as_millis() as u64);
                    return Ok(guard);
                }
                Ok(None) => {
                    contended = true;
                    debug!(attempt, "lock is held elsewhere");
                }
                Err(e) if e.is_store_error() => {
                    warn!(attempt, error = %e, "store error while acquiring lock");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt + 1 < max_retries {
                pause(backoff.delay_with_jitter(attempt), cancel.as_deref_mut()).await?;
            }
        }

        let span = Span::current();
        span.record("acquired", false);
        span.record("attempts", max_retries);
        span.record("elapsed_ms", start.elapsed().as_millis() as u64);

        match last_error {
            Some(source) if !contended => Err(LockError::StoreUnavailable {
                name: self.name.clone(),
                attempts: max_retries,
                source: Box::new(source),
            }),
            _ => Err(LockError::LockUnavailable {
                name: self.name.clone(),
                attempts: max_retries,
            }),
        }
    }

    async fn attempt(&self) -> LockResult<Option<LockGuard<S>>> {
        let token = generate_key();
        let created = self
            .store
            .create_if_absent(&self.key, &token, self.options.expiry, &self.namespace)
            .await?;
        Ok(created.then(|| {
            LockGuard::new(
                Arc::clone(&self.store),
                self.name.clone(),
                self.key.clone(),
                self.namespace.clone(),
                token,
                self.options.release_mode,
            )
        }))
    }
}

/// Sleeps for `delay`, returning early with [`LockError::Cancelled`] if the
/// cancellation signal turns `true`.
async fn pause(delay: Duration, cancel: Option<&mut watch::Receiver<bool>>) -> LockResult<()> {
    let Some(cancel) = cancel else {
        tokio::time::sleep(delay).await;
        return Ok(());
    };

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return Ok(()),
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow_and_update() => return Err(LockError::Cancelled),
                Ok(()) => continue,
                // Sender gone: nobody can cancel any more.
                Err(_) => {
                    sleep.as_mut().await;
                    return Ok(());
                }
            },
        }
    }
}

impl<S: EphemeralStore> Clone for EphemeralLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            key: self.key.clone(),
            namespace: self.namespace.clone(),
            options: self.options.clone(),
        }
    }
}

impl<S: EphemeralStore> std::fmt::Debug for EphemeralLock<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralLock")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
