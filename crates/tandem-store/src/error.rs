use tandem_types::ContentId;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(ContentId),

    /// Bytes do not hash to the identifier they were presented under.
    #[error("hash mismatch for {id}: bytes hash to {computed}")]
    HashMismatch { id: ContentId, computed: ContentId },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The block data is malformed or has the wrong shape.
    #[error("corrupt block {id}: {reason}")]
    CorruptBlock { id: ContentId, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
