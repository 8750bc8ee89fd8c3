//! Attachment decoding for the email ingestion channel.
//!
//! Handles CSV and JSON payloads in-crate. Per-row problems (missing email
//! cell, unparsable line) do not fail the upload, since the reconciliation
//! core skips and counts invalid rows anyway. A structurally unusable file
//! (no email column, non-array JSON) is rejected up front.

use std::collections::HashMap;

use crate::error::IngestApiError;
use crate::models::{DeltaMessageBody, UpsertMessageBody};
use rostra_reconcile::{DeltaMessage, UpsertMessage};

/// Maximum accepted attachment size.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Supported attachment formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

/// Pick a format from the uploaded file name.
///
/// XLSX attachments are decoded by an upstream collaborator and arrive here
/// as CSV; a raw workbook is rejected.
pub fn detect_format(file_name: &str) -> Result<FileFormat, IngestApiError> {
    let lower = file_name.trim().to_lowercase();
    if lower.ends_with(".csv") || lower.ends_with(".txt") {
        Ok(FileFormat::Csv)
    } else if lower.ends_with(".json") {
        Ok(FileFormat::Json)
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        Err(IngestApiError::validation(
            "workbook attachments must be converted to CSV before ingestion",
        ))
    } else {
        Err(IngestApiError::validation(format!(
            "unsupported attachment type: {file_name}"
        )))
    }
}

/// Guard the attachment size before decoding.
pub fn check_size(data: &[u8]) -> Result<(), IngestApiError> {
    if data.is_empty() {
        return Err(IngestApiError::validation("attachment is empty"));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(IngestApiError::validation(format!(
            "attachment of {} bytes exceeds the {MAX_FILE_SIZE}-byte limit",
            data.len()
        )));
    }
    Ok(())
}

/// Decode upsert rows from an attachment.
pub fn decode_upserts(
    format: FileFormat,
    data: &[u8],
) -> Result<Vec<UpsertMessage>, IngestApiError> {
    match format {
        FileFormat::Csv => decode_upserts_csv(data),
        FileFormat::Json => {
            let bodies: Vec<UpsertMessageBody> = serde_json::from_slice(data)
                .map_err(|e| IngestApiError::validation(format!("invalid JSON rows: {e}")))?;
            Ok(bodies.into_iter().map(Into::into).collect())
        }
    }
}

/// Decode delta rows from an attachment.
pub fn decode_deltas(format: FileFormat, data: &[u8]) -> Result<Vec<DeltaMessage>, IngestApiError> {
    match format {
        FileFormat::Csv => decode_deltas_csv(data),
        FileFormat::Json => {
            let bodies: Vec<DeltaMessageBody> = serde_json::from_slice(data)
                .map_err(|e| IngestApiError::validation(format!("invalid JSON rows: {e}")))?;
            Ok(bodies.into_iter().map(Into::into).collect())
        }
    }
}

/// Decode inline JSON rows (the non-multipart request body).
pub fn decode_upsert_values(
    rows: Vec<serde_json::Value>,
) -> Result<Vec<UpsertMessage>, IngestApiError> {
    rows.into_iter()
        .map(|value| {
            serde_json::from_value::<UpsertMessageBody>(value)
                .map(Into::into)
                .map_err(|e| IngestApiError::validation(format!("invalid row: {e}")))
        })
        .collect()
}

/// Decode inline JSON delta rows.
pub fn decode_delta_values(
    rows: Vec<serde_json::Value>,
) -> Result<Vec<DeltaMessage>, IngestApiError> {
    rows.into_iter()
        .map(|value| {
            serde_json::from_value::<DeltaMessageBody>(value)
                .map(Into::into)
                .map_err(|e| IngestApiError::validation(format!("invalid row: {e}")))
        })
        .collect()
}

fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim().to_lowercase().replace(['_', ' ', '-'], ""), idx))
        .collect()
}

fn cell<'a>(record: &'a csv::StringRecord, idx: Option<&usize>) -> Option<&'a str> {
    idx.and_then(|&i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn decode_upserts_csv(data: &[u8]) -> Result<Vec<UpsertMessage>, IngestApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| IngestApiError::validation(format!("unreadable CSV headers: {e}")))?
        .clone();
    let index = header_index(&headers);

    let Some(&email_idx) = index.get("email") else {
        return Err(IngestApiError::validation("CSV is missing an email column"));
    };
    let status_idx = index
        .get("statusinorg")
        .or_else(|| index.get("status"))
        .or_else(|| index.get("employmentstatus"));

    let mut rows = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            // The core counts skipped rows; an unparsable line is one of them.
            continue;
        };
        let email = record.get(email_idx).unwrap_or("").trim().to_string();
        rows.push(UpsertMessage {
            email,
            status_in_org: cell(&record, status_idx).map(ToString::to_string),
            event_id: None,
        });
    }
    Ok(rows)
}

fn decode_deltas_csv(data: &[u8]) -> Result<Vec<DeltaMessage>, IngestApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| IngestApiError::validation(format!("unreadable CSV headers: {e}")))?
        .clone();
    let index = header_index(&headers);

    let Some(&email_idx) = index.get("email") else {
        return Err(IngestApiError::validation("CSV is missing an email column"));
    };
    let Some(&type_idx) = index.get("deltatype") else {
        return Err(IngestApiError::validation(
            "CSV is missing a deltaType column",
        ));
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            continue;
        };
        rows.push(DeltaMessage {
            email: record.get(email_idx).unwrap_or("").trim().to_string(),
            delta_type: record.get(type_idx).unwrap_or("").trim().to_string(),
            event_id: None,
        });
    }
    Ok(rows)
}
