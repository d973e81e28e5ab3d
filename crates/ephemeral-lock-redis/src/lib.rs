//! Redis backend for ephemeral locks.
//!
//! Lock records are plain Redis strings written with `SET NX PX`, so any
//! number of processes pointed at the same server exclude each other.

pub mod store;

pub use store::{RedisStore, RedisStoreBuilder};
