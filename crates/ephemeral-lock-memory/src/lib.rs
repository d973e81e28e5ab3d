//! In-process backend for ephemeral locks.
//!
//! Locks taken through a [`MemoryStore`] only exclude tasks and threads of
//! the same process. Useful for single-instance deployments and tests.

pub mod store;

pub use store::{MemoryStore, MemoryStoreBuilder};
