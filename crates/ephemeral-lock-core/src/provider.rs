//! Entry point for creating locks against a shared store.

use std::future::Future;
use std::sync::Arc;

use crate::error::{LockError, LockResult};
use crate::identity::{DEFAULT_SEPARATOR, Identifiable, derive_name};
use crate::lock::EphemeralLock;
use crate::options::LockOptions;
use crate::store::EphemeralStore;

/// Namespace lock records live in unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "mutex";

/// Builder for [`EphemeralLockProvider`].
pub struct EphemeralLockProviderBuilder<S> {
    store: Option<Arc<S>>,
    namespace: String,
    separator: String,
    options: LockOptions,
}

impl<S: EphemeralStore> EphemeralLockProviderBuilder<S> {
    /// Creates a builder with the default namespace and options.
    pub fn new() -> Self {
        Self {
            store: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            options: LockOptions::default(),
        }
    }

    /// Sets the store lock records are written to.
    pub fn store(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Sets a store that is shared with other parts of the process.
    pub fn shared_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the namespace lock records are written to.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the separator joining identity path parts in entity lock names.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the options new locks start with.
    pub fn options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if no store was given, the namespace or separator is
    /// empty, or the options are out of range.
    pub fn build(self) -> LockResult<EphemeralLockProvider<S>> {
        let store = self
            .store
            .ok_or_else(|| LockError::InvalidName("no store provided".to_string()))?;
        if self.namespace.is_empty() {
            return Err(LockError::InvalidName("namespace cannot be empty".to_string()));
        }
        if self.separator.is_empty() {
            return Err(LockError::InvalidIdentity("separator cannot be empty".to_string()));
        }
        self.options.validate()?;

        Ok(EphemeralLockProvider {
            store,
            namespace: self.namespace,
            separator: self.separator,
            options: self.options,
        })
    }
}

impl<S: EphemeralStore> Default for EphemeralLockProviderBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for named locks sharing one store, namespace and default options.
///
/// Build one per process and hand it to whatever needs locking; every
/// process pointed at the same store and namespace competes for the same
/// locks.
///
/// # Example
///
/// ```rust,ignore
/// let provider = EphemeralLockProvider::new(store);
///
/// provider
///     .run_locked("order:42", || async {
///         charge_customer().await
///     })
///     .await??;
/// ```
pub struct EphemeralLockProvider<S: EphemeralStore> {
    store: Arc<S>,
    namespace: String,
    separator: String,
    options: LockOptions,
}

impl<S: EphemeralStore> EphemeralLockProvider<S> {
    /// Returns a new builder for configuring the provider.
    pub fn builder() -> EphemeralLockProviderBuilder<S> {
        EphemeralLockProviderBuilder::new()
    }

    /// Creates a provider with the default namespace and options.
    pub fn new(store: S) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Creates a provider over a shared store with the default namespace and options.
    pub fn with_shared_store(store: Arc<S>) -> Self {
        Self {
            store,
            namespace: DEFAULT_NAMESPACE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            options: LockOptions::default(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Namespace lock records are written to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Separator used when deriving entity lock names.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Options new locks start with.
    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Creates a lock with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidName`] for an empty name.
    pub fn create_lock(&self, name: &str) -> LockResult<EphemeralLock<S>> {
        EphemeralLock::new(
            Arc::clone(&self.store),
            name,
            &self.namespace,
            self.options.clone(),
        )
    }

    /// Creates a lock named after an entity's identity path.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::InvalidIdentity`] if the identity cannot be
    /// turned into a name.
    pub fn create_lock_for<E: Identifiable + ?Sized>(
        &self,
        entity: &E,
    ) -> LockResult<EphemeralLock<S>> {
        let name = derive_name(&entity.identity_path(), &self.separator)?;
        self.create_lock(&name)
    }

    /// Runs `action` under the named lock with the provider's options.
    pub async fn run_locked<F, Fut, T>(&self, name: &str, action: F) -> LockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.create_lock(name)?.run(action).await
    }

    /// Runs `action` under the lock derived from `entity`'s identity.
    pub async fn run_locked_for<E, F, Fut, T>(&self, entity: &E, action: F) -> LockResult<T>
    where
        E: Identifiable + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.create_lock_for(entity)?.run(action).await
    }
}

impl<S: EphemeralStore> Clone for EphemeralLockProvider<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
            separator: self.separator.clone(),
            options: self.options.clone(),
        }
    }
}
