/// Error types for table and window access.
///
/// Positional and keyed lookups are contract checks: a bad index or key is
/// reported to the caller and never retried or recovered internally.

/// Result type alias for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors raised by tables, sliding windows and their persisted forms.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// A positional accessor was called outside `[0, len)`.
    #[error("Index {index} out of range [0, {len})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of valid positions at the time of the call.
        len: usize,
    },

    /// A row or column key does not resolve to a visible cell.
    ///
    /// Sliding windows report keys hidden by the window with this same
    /// variant, so callers cannot tell "absent" from "outside the window".
    #[error("Unknown key '{key}'")]
    UnknownKey {
        /// The key that failed to resolve.
        key: String,
    },

    /// A persisted table snapshot is structurally inconsistent.
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Description of the inconsistency.
        message: String,
    },

    /// Encoding or decoding a persisted form or config failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TableError {
    pub(crate) fn index_out_of_range(index: usize, len: usize) -> Self {
        TableError::IndexOutOfRange { index, len }
    }

    pub(crate) fn unknown_key(key: &str) -> Self {
        TableError::UnknownKey {
            key: key.to_string(),
        }
    }

    /// Returns true for the `UnknownKey` variant.
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, TableError::UnknownKey { .. })
    }

    /// Returns true for the `IndexOutOfRange` variant.
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, TableError::IndexOutOfRange { .. })
    }
}
