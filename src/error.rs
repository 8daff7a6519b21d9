//! Error types for the ordered cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the ordered cache.
///
/// Cloneable so that a single load outcome can be handed to every caller
/// waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key is absent or expired and no loader produced a value
    #[error("Key not found")]
    KeyNotFound,

    /// Insert rejected because eviction could not free a slot
    #[error("Cache full: capacity of {0} entries reached")]
    CapacityExceeded(usize),

    /// No live entry left to dequeue or peek
    #[error("Queue is empty")]
    EmptyQueue,

    /// Caller passed malformed input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal precondition broken, e.g. an unsorted compaction position list
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// Serialize or deserialize hook failed
    #[error("Serialization failed: {0}")]
    Serialization(Arc<anyhow::Error>),

    /// Loader failed to produce a value
    #[error("Loader failed: {0}")]
    Loader(Arc<anyhow::Error>),
}

impl CacheError {
    /// Wraps a codec hook error.
    pub fn serialization(err: anyhow::Error) -> Self {
        CacheError::Serialization(Arc::new(err))
    }

    /// Wraps a loader error.
    pub fn loader(err: anyhow::Error) -> Self {
        CacheError::Loader(Arc::new(err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the ordered cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(CacheError::KeyNotFound.to_string(), "Key not found");
        assert_eq!(
            CacheError::CapacityExceeded(8).to_string(),
            "Cache full: capacity of 8 entries reached"
        );
        assert_eq!(CacheError::EmptyQueue.to_string(), "Queue is empty");
    }

    #[test]
    fn test_hook_errors_keep_source_message() {
        let err = CacheError::loader(anyhow::anyhow!("backend down"));
        assert_eq!(err.to_string(), "Loader failed: backend down");

        let cloned = err.clone();
        assert!(matches!(cloned, CacheError::Loader(_)));

        let err = CacheError::serialization(anyhow::anyhow!("bad bytes"));
        assert_eq!(err.to_string(), "Serialization failed: bad bytes");
    }
}
