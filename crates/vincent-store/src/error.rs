//! Policy directory error types.

/// Errors from policy directory reads.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection to the backing store failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A directory read failed.
    #[error("directory error: {0}")]
    Internal(String),

    /// A stored record could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for policy directory operations.
pub type StoreResult<T> = Result<T, StoreError>;
