//! Handlers for the event-stream ingestion endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use rostra_core::{IngestChannel, OrgId};
use rostra_reconcile::{DeltaMessage, UpsertMessage};

use crate::error::{IngestApiError, Result};
use crate::models::{
    DeltaIngestRequest, DeltaIngestResponse, UpsertIngestRequest, UpsertIngestResponse,
};
use crate::router::IngestState;

/// Query parameters the bridge attaches to its batch posts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestQuery {
    /// Source event of the batch; enables event-level idempotency.
    #[serde(default)]
    pub event_id: Option<String>,
}

/// `POST /ingest/kafka/upserts`: one snapshot batch for one organization.
///
/// Begins a new epoch, reconciles the rows under it, and finalizes when
/// `closeAfter` is set. A batch whose `eventId` was already processed is
/// answered with 409; the bridge counts that as success.
#[instrument(skip(state, request), fields(org = %request.org_id, rows = request.messages.len()))]
pub async fn ingest_upserts(
    State(state): State<IngestState>,
    Query(query): Query<IngestQuery>,
    Json(request): Json<UpsertIngestRequest>,
) -> Result<Json<UpsertIngestResponse>> {
    let org = OrgId::new(&request.org_id).ok_or(IngestApiError::MissingField("orgId"))?;

    if let Some(event_id) = &query.event_id {
        if state.events.seen(org.as_str(), event_id) {
            return Err(IngestApiError::DuplicateEvent {
                event_id: event_id.clone(),
            });
        }
    }

    let messages: Vec<UpsertMessage> =
        request.messages.into_iter().map(Into::into).collect();

    let report = state
        .service
        .ingest_upserts(&org, None, &messages, IngestChannel::Kafka, request.close_after)
        .await?;

    // Only fully-applied batches enter the ledger; a failed batch may be
    // retried under the same event id.
    if report.errors == 0 {
        if let Some(event_id) = &query.event_id {
            state.events.record(org.as_str(), event_id);
        }
    }

    Ok(Json(report.into()))
}

/// `POST /ingest/kafka/deltas`: delta transitions, applied in order.
#[instrument(skip(state, request), fields(org = %request.org_id, rows = request.messages.len()))]
pub async fn ingest_deltas(
    State(state): State<IngestState>,
    Json(request): Json<DeltaIngestRequest>,
) -> Result<Json<DeltaIngestResponse>> {
    let org = OrgId::new(&request.org_id).ok_or(IngestApiError::MissingField("orgId"))?;
    let messages: Vec<DeltaMessage> =
        request.messages.into_iter().map(Into::into).collect();

    let outcome = state
        .service
        .ingest_deltas(&org, &messages, IngestChannel::Kafka)
        .await?;

    Ok(Json(DeltaIngestResponse {
        success: true,
        processed: outcome.processed,
        skipped: outcome.skipped,
    }))
}
