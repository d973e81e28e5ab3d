//! Error types for ephemeral lock operations.

use thiserror::Error;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Every acquisition attempt found the lock held.
    #[error("unable to lock on: {name} within {attempts} attempts")]
    LockUnavailable {
        /// Name of the contended lock.
        name: String,
        /// Number of acquisition attempts made.
        attempts: u32,
    },

    /// Every acquisition attempt failed because the store could not be reached.
    #[error("store unavailable while locking {name} ({attempts} attempts): {source}")]
    StoreUnavailable {
        /// Name of the lock being acquired.
        name: String,
        /// Number of acquisition attempts made.
        attempts: u32,
        /// Error reported by the last attempt.
        #[source]
        source: Box<LockError>,
    },

    /// Identity path could not be turned into a lock name.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// Lock options are out of range.
    #[error("invalid lock options: {0}")]
    InvalidOptions(String),

    /// Key generator alphabet is unusable.
    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),

    /// Invalid lock name or namespace.
    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// Lock acquisition was cancelled while waiting.
    #[error("lock operation was cancelled")]
    Cancelled,

    /// Lock record was gone or owned by someone else at release time.
    #[error("lock was lost: {0}")]
    LockLost(String),

    /// Store connection failed.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Store-specific error.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Returns `true` for errors raised by a store adapter rather than by
    /// the lock protocol itself.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Backend(_))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unavailable_names_the_lock() {
        let err = LockError::LockUnavailable {
            name: "order:42".to_string(),
            attempts: 5,
        };
        assert_eq!(err.to_string(), "unable to lock on: order:42 within 5 attempts");
    }

    #[test]
    fn test_store_error_classification() {
        let backend = LockError::Backend(Box::new(std::io::Error::other("boom")));
        assert!(backend.is_store_error());
        assert!(!LockError::Cancelled.is_store_error());
        assert!(!LockError::InvalidIdentity("empty".into()).is_store_error());
    }

    #[test]
    fn test_store_unavailable_exposes_source() {
        use std::error::Error as _;

        let err = LockError::StoreUnavailable {
            name: "jobs".to_string(),
            attempts: 2,
            source: Box::new(LockError::Connection(Box::new(std::io::Error::other(
                "refused",
            )))),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("jobs"));
    }
}
