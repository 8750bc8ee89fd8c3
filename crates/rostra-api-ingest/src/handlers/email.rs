//! Handler for the email attachment channel.
//!
//! Accepts either multipart form data (`orgId`, `orgName?`, `kind?`, `file`)
//! or a JSON body (`orgId`, `orgName?`, `kind?`, `rows`). Upsert payloads
//! always open a fresh epoch and finalize it afterwards: an attachment is a
//! complete snapshot by contract.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use tracing::{info, instrument};

use rostra_core::{IngestChannel, OrgId};

use crate::error::{IngestApiError, Result};
use crate::models::{EmailIngestRequest, EmailIngestResponse, IngestFileKind};
use crate::router::IngestState;
use crate::services::decode;

/// `POST /ingest/email`.
#[instrument(skip(state, request))]
pub async fn ingest_email(
    State(state): State<IngestState>,
    request: Request,
) -> Result<Json<EmailIngestResponse>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let upload = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| IngestApiError::BadBody(e.to_string()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body): Json<EmailIngestRequest> = Json::from_request(request, &state)
            .await
            .map_err(|e| IngestApiError::BadBody(e.to_string()))?;
        Upload {
            org_id: body.org_id,
            org_name: body.org_name,
            kind: body.kind,
            payload: Payload::InlineRows(body.rows),
        }
    };

    let org = OrgId::new(&upload.org_id).ok_or(IngestApiError::MissingField("orgId"))?;

    let processed = match upload.kind {
        IngestFileKind::Upserts => {
            let messages = match upload.payload {
                Payload::InlineRows(rows) => decode::decode_upsert_values(rows)?,
                Payload::File { name, data } => {
                    let format = decode::detect_format(&name)?;
                    decode::check_size(&data)?;
                    decode::decode_upserts(format, &data)?
                }
            };
            // Email snapshots are complete rosters: always close the epoch.
            let report = state
                .service
                .ingest_upserts(
                    &org,
                    upload.org_name.as_deref(),
                    &messages,
                    IngestChannel::Email,
                    true,
                )
                .await?;
            info!(org = %org, epoch = report.epoch, processed = report.processed, "email snapshot ingested");
            report.processed
        }
        IngestFileKind::Deltas => {
            let messages = match upload.payload {
                Payload::InlineRows(rows) => decode::decode_delta_values(rows)?,
                Payload::File { name, data } => {
                    let format = decode::detect_format(&name)?;
                    decode::check_size(&data)?;
                    decode::decode_deltas(format, &data)?
                }
            };
            let outcome = state
                .service
                .ingest_deltas(&org, &messages, IngestChannel::Email)
                .await?;
            outcome.processed
        }
    };

    Ok(Json(EmailIngestResponse {
        success: true,
        processed,
        kind: upload.kind,
    }))
}

enum Payload {
    InlineRows(Vec<serde_json::Value>),
    File { name: String, data: Vec<u8> },
}

struct Upload {
    org_id: String,
    org_name: Option<String>,
    kind: IngestFileKind,
    payload: Payload,
}

async fn read_multipart(mut multipart: Multipart) -> Result<Upload> {
    let mut org_id: Option<String> = None;
    let mut org_name: Option<String> = None;
    let mut kind = IngestFileKind::default();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestApiError::BadBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "orgId" => {
                org_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| IngestApiError::BadBody(e.to_string()))?,
                );
            }
            "orgName" => {
                org_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| IngestApiError::BadBody(e.to_string()))?,
                );
            }
            "kind" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| IngestApiError::BadBody(e.to_string()))?;
                kind = IngestFileKind::parse(&raw).ok_or_else(|| {
                    IngestApiError::validation(format!("unknown kind: {raw}"))
                })?;
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| IngestApiError::BadBody(e.to_string()))?;
                file = Some((file_name, data.to_vec()));
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let org_id = org_id.ok_or(IngestApiError::MissingField("orgId"))?;
    let (name, data) = file.ok_or(IngestApiError::MissingField("file"))?;

    Ok(Upload {
        org_id,
        org_name,
        kind,
        payload: Payload::File { name, data },
    })
}
