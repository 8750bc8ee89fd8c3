//! Health endpoint.

use axum::Json;
use chrono::Utc;

use crate::models::HealthResponse;

/// `GET /health`. No auth, no dependencies touched.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "rostra",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}
