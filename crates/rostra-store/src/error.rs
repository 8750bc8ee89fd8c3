//! Store error types.

use thiserror::Error;

/// Error type for document-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document does not exist (returned by `update` on a missing path).
    #[error("document not found: {path}")]
    NotFound { path: String },

    /// A batch exceeded the store's atomic-commit limit.
    #[error("batch of {len} ops exceeds the {max}-op store limit")]
    BatchTooLarge { len: usize, max: usize },

    /// An `in` filter carried more operands than the store accepts.
    #[error("`in` query with {len} operands exceeds the {max}-operand store limit")]
    InQueryTooLarge { len: usize, max: usize },

    /// A query referenced an unsupported shape (e.g. cursor without order).
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The backend is temporarily unavailable; safe to retry.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Non-retryable backend failure.
    #[error("store backend error: {message}")]
    Backend { message: String },

    /// Document fields failed to (de)serialize.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the operation may succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Convenience constructor for backend failures.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Convenience constructor for transient failures.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable {
                    message: err.to_string(),
                }
            }
            _ => StoreError::Backend {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(StoreError::unavailable("connection reset").is_transient());
        assert!(!StoreError::backend("constraint violated").is_transient());
        assert!(!StoreError::NotFound {
            path: "organizations/acme".into()
        }
        .is_transient());
        assert!(!StoreError::BatchTooLarge { len: 501, max: 500 }.is_transient());
    }
}
