//! Error types for the tiered store.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the low-level tier stores.
///
/// The [`TierManager`](crate::TierManager) never lets these reach its
/// read/write surface: a faulty read is a miss and a failed write is logged
/// and swallowed. The per-tier APIs return them directly for callers that
/// need to observe the cause.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored entry exists but cannot be decoded
    #[error("Corrupted entry for key '{key}': {reason}")]
    Corrupted { key: String, reason: String },

    /// The durable tier could not be initialised
    #[error("Durable tier unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Create a corrupted-entry error.
    pub fn corrupted<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::Corrupted {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable-tier error.
    pub fn unavailable<R: Into<String>>(reason: R) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}
