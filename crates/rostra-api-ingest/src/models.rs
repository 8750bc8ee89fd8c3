//! API request/response models.
//!
//! All models carry serde and utoipa derives for JSON serialization and
//! OpenAPI documentation. Wire field names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use rostra_reconcile::{DeltaMessage, UpsertMessage, UpsertReport};

/// One upsert row in an ingestion request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMessageBody {
    /// Employee email; normalized and validated downstream.
    pub email: String,
    /// Free-form status string.
    #[serde(default, alias = "status")]
    pub status_in_org: Option<String>,
    /// Source event the row belongs to.
    #[serde(default)]
    pub event_id: Option<String>,
}

impl From<UpsertMessageBody> for UpsertMessage {
    fn from(body: UpsertMessageBody) -> Self {
        Self {
            email: body.email,
            status_in_org: body.status_in_org,
            event_id: body.event_id,
        }
    }
}

/// `POST /ingest/kafka/upserts` request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertIngestRequest {
    pub org_id: String,
    #[serde(default)]
    pub messages: Vec<UpsertMessageBody>,
    /// Finalize the allocated epoch after processing.
    #[serde(default)]
    pub close_after: bool,
}

/// `POST /ingest/kafka/upserts` response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertIngestResponse {
    pub success: bool,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub epoch: i64,
    pub finalized: bool,
    pub duration_ms: u64,
}

impl From<UpsertReport> for UpsertIngestResponse {
    fn from(report: UpsertReport) -> Self {
        Self {
            success: report.errors == 0,
            processed: report.processed,
            skipped: report.skipped,
            errors: report.errors,
            epoch: report.epoch,
            finalized: report.finalized,
            duration_ms: report.duration_ms,
        }
    }
}

/// One delta row in an ingestion request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeltaMessageBody {
    pub email: String,
    #[serde(alias = "delta_type")]
    pub delta_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
}

impl From<DeltaMessageBody> for DeltaMessage {
    fn from(body: DeltaMessageBody) -> Self {
        Self {
            email: body.email,
            delta_type: body.delta_type,
            event_id: body.event_id,
        }
    }
}

/// `POST /ingest/kafka/deltas` request.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeltaIngestRequest {
    pub org_id: String,
    #[serde(default)]
    pub messages: Vec<DeltaMessageBody>,
}

/// `POST /ingest/kafka/deltas` response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeltaIngestResponse {
    pub success: bool,
    pub processed: usize,
    pub skipped: usize,
}

/// What an email-channel payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IngestFileKind {
    #[default]
    Upserts,
    Deltas,
}

impl IngestFileKind {
    /// Parse the multipart form value. Empty defaults to upserts.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "upserts" => Some(Self::Upserts),
            "deltas" => Some(Self::Deltas),
            _ => None,
        }
    }

    /// The wire form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upserts => "upserts",
            Self::Deltas => "deltas",
        }
    }
}

/// `POST /ingest/email` JSON request (the non-multipart form).
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailIngestRequest {
    pub org_id: String,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default)]
    pub kind: IngestFileKind,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<serde_json::Value>,
}

/// `POST /ingest/email` response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailIngestResponse {
    pub success: bool,
    pub processed: usize,
    pub kind: IngestFileKind,
}

/// `GET /health` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_request_accepts_camel_case() {
        let json = r#"{
            "orgId": "acme",
            "messages": [{"email": "a@x.com", "statusInOrg": "active", "eventId": "e1"}],
            "closeAfter": true
        }"#;
        let req: UpsertIngestRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.org_id, "acme");
        assert!(req.close_after);
        assert_eq!(req.messages[0].status_in_org.as_deref(), Some("active"));
    }

    #[test]
    fn test_upsert_request_defaults() {
        let req: UpsertIngestRequest = serde_json::from_str(r#"{"orgId": "acme"}"#).unwrap();
        assert!(req.messages.is_empty());
        assert!(!req.close_after);
    }

    #[test]
    fn test_status_alias() {
        let body: UpsertMessageBody =
            serde_json::from_str(r#"{"email": "a@x.com", "status": "active"}"#).unwrap();
        assert_eq!(body.status_in_org.as_deref(), Some("active"));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(IngestFileKind::parse(""), Some(IngestFileKind::Upserts));
        assert_eq!(
            IngestFileKind::parse("Deltas"),
            Some(IngestFileKind::Deltas)
        );
        assert_eq!(IngestFileKind::parse("bogus"), None);
    }
}
