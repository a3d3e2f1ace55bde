//! Storage error types.

/// Errors that can occur during key-value storage operations.
///
/// Absence of a key is not an error: `get`/`take` return `None`. Errors are
/// reserved for infrastructure failures (backend unreachable, serialization
/// at the backend boundary).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage backend is unavailable or the operation failed.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A stored value could not be interpreted.
    #[error("Corrupt stored value for key '{key}': {message}")]
    Corrupt {
        /// Key whose value was unreadable.
        key: String,
        /// Description of the corruption.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `Corrupt` error.
    #[must_use]
    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the operation could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}
