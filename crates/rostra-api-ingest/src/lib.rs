//! # rostra-api-ingest
//!
//! HTTP surface of the roster reconciliation core:
//!
//! - `GET  /health`: liveness and version, no auth
//! - `POST /ingest/kafka/upserts`: snapshot batches from the bridge
//! - `POST /ingest/kafka/deltas`: delta batches from the bridge
//! - `POST /ingest/email`: CSV/JSON attachments or inline JSON rows
//!
//! Ingestion routes authenticate with the shared `X-Auth` token.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::IngestApiError;
pub use router::{ingest_router, IngestState};
