//! Distributed locks over a shared TTL key-value store.
//!
//! A lock is a store entry created only if absent, with a time-to-live.
//! Whoever creates the entry holds the lock until deleting it; if the holder
//! crashes, the TTL frees the lock after `expiry`. Contended acquisitions
//! retry with exponential backoff and jitter a bounded number of times.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ephemeral_lock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One provider per process, pointed at the shared store
//!     let provider = EphemeralLockProvider::builder()
//!         .store(MemoryStore::new())
//!         .options(LockOptions::new().expiry(Duration::from_secs(30)))
//!         .build()?;
//!
//!     // Protected section; the lock is released however it ends
//!     let total = provider
//!         .run_locked("order:42", || async { 40 + 2 })
//!         .await?;
//!     assert_eq!(total, 42);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Locking entities
//!
//! Types implementing [`Identifiable`] are locked by their ancestor chain,
//! flattened into a name such as `Customer:c8Hq:Order:42`.
//!
//! ```rust,no_run
//! # use ephemeral_lock::*;
//! struct Order { customer: String, number: i64 }
//!
//! impl Identifiable for Order {
//!     fn identity_path(&self) -> IdentityPath {
//!         IdentityPath::root("Customer", self.customer.as_str()).child("Order", self.number)
//!     }
//! }
//!
//! # async fn demo(provider: EphemeralLockProvider<MemoryStore>, order: Order) -> LockResult<()> {
//! provider.run_locked_for(&order, || async { /* ... */ }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process, for single-instance deployments and tests.
//! - `RedisStore` (feature `redis`, on by default): `SET NX PX` on a shared
//!   Redis server.
//!
//! # Crate Organization
//!
//! This is a facade re-exporting:
//! - `ephemeral-lock-core`: coordinator, store contract, naming and key generation
//! - `ephemeral-lock-memory`: in-process backend
//! - `ephemeral-lock-redis`: Redis backend

// Re-export core types
pub use ephemeral_lock_core::*;

// Re-export in-process backend
pub use ephemeral_lock_memory::{MemoryStore, MemoryStoreBuilder};

// Re-export Redis backend
#[cfg(feature = "redis")]
pub use ephemeral_lock_redis::{RedisStore, RedisStoreBuilder};
