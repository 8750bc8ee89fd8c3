//! Reconciliation error types.

use thiserror::Error;

use rostra_store::StoreError;

/// Error type for reconciliation operations.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The circuit breaker is open; the store is considered overloaded.
    #[error("circuit open; retry after {retry_after_ms} ms")]
    CircuitOpen { retry_after_ms: u64 },

    /// Store failure that survived the reconciler's own tolerance.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The invocation input was unusable as a whole (per-row problems are
    /// skipped and counted instead).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl ReconcileError {
    /// Whether the operation may succeed if retried later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } => true,
            Self::Store(e) => e.is_transient(),
            Self::InvalidInput { .. } => false,
        }
    }

    /// Convenience constructor for invocation-level input failures.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
