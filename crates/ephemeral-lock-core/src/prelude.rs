//! Convenience prelude for ephemeral lock types.

pub use crate::error::{LockError, LockResult};
pub use crate::identity::{EntityId, Identifiable, IdentityPath};
pub use crate::lock::EphemeralLock;
pub use crate::options::{LockOptions, ReleaseMode};
pub use crate::provider::EphemeralLockProvider;
pub use crate::store::EphemeralStore;
