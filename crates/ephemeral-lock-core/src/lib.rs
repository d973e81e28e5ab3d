//! Core types for locks over a shared ephemeral key-value store.
//!
//! A lock is a store entry created with "add if absent" semantics and a TTL.
//! Holding the entry means holding the lock; deleting it releases the lock,
//! and the TTL bounds how long a crashed holder can block everyone else.
//!
//! Backends implement [`EphemeralStore`]; [`EphemeralLockProvider`] turns a
//! store into named locks with retry, backoff and guaranteed release.

pub mod backoff;
pub mod error;
pub mod guard;
pub mod identity;
pub mod key;
pub mod keygen;
pub mod lock;
pub mod options;
pub mod prelude;
pub mod provider;
pub mod store;

pub use backoff::BackoffPolicy;
pub use error::{LockError, LockResult};
pub use guard::LockGuard;
pub use identity::{
    DEFAULT_SEPARATOR, EntityId, Identifiable, IdentityPath, PathElement, derive_default_name,
    derive_name,
};
pub use key::to_store_key;
pub use keygen::{
    Alphabet, generate, generate_key, generate_long_key, generate_medium_key, generate_short_key,
    generate_with,
};
pub use lock::EphemeralLock;
pub use options::{LockOptions, ReleaseMode};
pub use provider::{DEFAULT_NAMESPACE, EphemeralLockProvider, EphemeralLockProviderBuilder};
pub use store::EphemeralStore;
