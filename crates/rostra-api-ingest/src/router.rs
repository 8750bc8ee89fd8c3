//! Router and shared state for the ingestion API.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};

use rostra_reconcile::RosterService;

use crate::auth::require_ingest_token;
use crate::handlers;
use crate::services::decode::MAX_FILE_SIZE;
use crate::services::idempotency::EventLedger;

/// Shared state for ingestion routes.
#[derive(Clone)]
pub struct IngestState {
    /// The reconciliation core.
    pub service: Arc<RosterService>,
    /// Opaque bearer token expected in `X-Auth`.
    pub ingestion_token: String,
    /// Processed-event ledger backing the 409 duplicate contract.
    pub events: Arc<EventLedger>,
}

impl IngestState {
    /// Create a new `IngestState`.
    pub fn new(service: Arc<RosterService>, ingestion_token: impl Into<String>) -> Self {
        Self {
            service,
            ingestion_token: ingestion_token.into(),
            events: Arc::new(EventLedger::new()),
        }
    }
}

/// Build the ingestion router.
///
/// - `GET  /health`: open
/// - `POST /ingest/kafka/upserts`: token-protected
/// - `POST /ingest/kafka/deltas`: token-protected
/// - `POST /ingest/email`: token-protected, multipart or JSON
pub fn ingest_router(state: IngestState) -> Router {
    let protected = Router::new()
        .route("/ingest/kafka/upserts", post(handlers::kafka::ingest_upserts))
        .route("/ingest/kafka/deltas", post(handlers::kafka::ingest_deltas))
        .route("/ingest/email", post(handlers::email::ingest_email))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_ingest_token,
        ))
        // Attachments can be large; the decoder enforces its own cap too.
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(protected)
}
