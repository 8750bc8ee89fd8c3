//! Ingestion API error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use rostra_reconcile::ReconcileError;

/// Error type for ingestion API operations.
#[derive(Debug, Error)]
pub enum IngestApiError {
    /// A required request field was missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Request validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or wrong `X-Auth` token.
    #[error("unauthorized")]
    Unauthorized,

    /// The `(org, event)` pair was already processed; the retried batch is
    /// a semantic duplicate.
    #[error("event {event_id} was already processed")]
    DuplicateEvent { event_id: String },

    /// The request body could not be read or parsed.
    #[error("unreadable request body: {0}")]
    BadBody(String),

    /// Reconciliation failure (circuit open, store failure).
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl IngestApiError {
    /// Convenience constructor for validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl IntoResponse for IngestApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            IngestApiError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, "missing_field", self.to_string())
            }
            IngestApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                self.to_string(),
            ),
            IngestApiError::BadBody(_) => {
                (StatusCode::BAD_REQUEST, "bad_request", self.to_string())
            }
            IngestApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
            }
            IngestApiError::DuplicateEvent { .. } => {
                (StatusCode::CONFLICT, "duplicate_event", self.to_string())
            }
            IngestApiError::Reconcile(ReconcileError::CircuitOpen { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "circuit_open",
                self.to_string(),
            ),
            IngestApiError::Reconcile(e) => {
                error!(error = %e, "reconciliation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    self.to_string(),
                )
            }
        };

        let body = json!({
            "error": error_type,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for ingestion API operations.
pub type Result<T> = std::result::Result<T, IngestApiError>;
