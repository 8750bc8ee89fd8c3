//! Shared-token authentication for ingestion routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::IngestApiError;
use crate::router::IngestState;

/// Header carrying the opaque ingestion token.
pub const AUTH_HEADER: &str = "x-auth";

/// Reject requests whose `X-Auth` header does not match the configured
/// ingestion token.
pub async fn require_ingest_token(
    State(state): State<IngestState>,
    request: Request,
    next: Next,
) -> Result<Response, IngestApiError> {
    let presented = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());
    match presented {
        Some(token) if token == state.ingestion_token => Ok(next.run(request).await),
        _ => Err(IngestApiError::Unauthorized),
    }
}
