//! Source-event wire types and intake validation.
//!
//! Malformed messages never crash the consumer: parsing returns
//! [`BridgeError::InvalidMessage`] and the caller logs and skips. Row emails
//! are lowercased and trimmed here, before batching, so every later stage
//! sees the normalized form.

use serde::{Deserialize, Serialize};

use rostra_core::{normalize_email, EventId, OrgId};

use crate::error::{BridgeError, BridgeResult};

/// One upsert row as carried on the wire and forwarded to the ingestion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRow {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_in_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// A raw upsert event: one message of a (possibly multi-message) snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertEvent {
    pub org_id: String,
    pub event_id: String,
    pub rows: Vec<UpsertRow>,
}

/// An upsert event after validation and email normalization.
#[derive(Debug, Clone)]
pub struct ValidatedUpsert {
    pub org: OrgId,
    pub event: EventId,
    pub rows: Vec<UpsertRow>,
}

impl UpsertEvent {
    /// Parse and validate a raw payload.
    pub fn parse(payload: &[u8]) -> BridgeResult<ValidatedUpsert> {
        let event: UpsertEvent = serde_json::from_slice(payload)
            .map_err(|e| BridgeError::invalid(format!("unparsable upsert event: {e}")))?;
        event.validate()
    }

    /// Validate ids and normalize row emails.
    pub fn validate(self) -> BridgeResult<ValidatedUpsert> {
        let org = OrgId::new(&self.org_id)
            .ok_or_else(|| BridgeError::invalid("upsert event without orgId"))?;
        let event = EventId::new(&self.event_id)
            .ok_or_else(|| BridgeError::invalid("upsert event without eventId"))?;

        let event_id = event.as_str().to_string();
        let rows = self
            .rows
            .into_iter()
            .map(|row| UpsertRow {
                email: normalize_email(&row.email),
                status_in_org: row.status_in_org,
                // Rows inherit the event they arrived under unless they
                // already carry one.
                event_id: row.event_id.or_else(|| Some(event_id.clone())),
            })
            .collect();

        Ok(ValidatedUpsert { org, event, rows })
    }
}

/// A raw delta event: a single-employee status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaEvent {
    pub org_id: String,
    pub email: String,
    pub delta_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl DeltaEvent {
    /// Parse and minimally validate a raw payload. The transition itself is
    /// validated downstream; the bridge only guards the envelope.
    pub fn parse(payload: &[u8]) -> BridgeResult<(OrgId, DeltaEvent)> {
        let mut event: DeltaEvent = serde_json::from_slice(payload)
            .map_err(|e| BridgeError::invalid(format!("unparsable delta event: {e}")))?;
        let org = OrgId::new(&event.org_id)
            .ok_or_else(|| BridgeError::invalid("delta event without orgId"))?;
        event.email = normalize_email(&event.email);
        if event.email.is_empty() {
            return Err(BridgeError::invalid("delta event without email"));
        }
        Ok((org, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upsert_event() {
        let payload = br#"{
            "orgId": "acme",
            "eventId": "evt-1",
            "rows": [{"email": "  Alice@X.COM ", "statusInOrg": "Active"}]
        }"#;
        let validated = UpsertEvent::parse(payload).unwrap();
        assert_eq!(validated.org.as_str(), "acme");
        assert_eq!(validated.event.as_str(), "evt-1");
        assert_eq!(validated.rows[0].email, "alice@x.com");
        assert_eq!(validated.rows[0].event_id.as_deref(), Some("evt-1"));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(UpsertEvent::parse(br#"{"eventId": "e", "rows": []}"#).is_err());
        assert!(UpsertEvent::parse(br#"{"orgId": "", "eventId": "e", "rows": []}"#).is_err());
        assert!(UpsertEvent::parse(br#"{"orgId": "acme", "rows": []}"#).is_err());
        // rows must be an array
        assert!(
            UpsertEvent::parse(br#"{"orgId": "acme", "eventId": "e", "rows": 7}"#).is_err()
        );
        assert!(UpsertEvent::parse(b"not json at all").is_err());
    }

    #[test]
    fn test_parse_delta_event() {
        let payload = br#"{"orgId": "acme", "email": " Bob@X.com ", "deltaType": "left", "eventId": "evt-2"}"#;
        let (org, delta) = DeltaEvent::parse(payload).unwrap();
        assert_eq!(org.as_str(), "acme");
        assert_eq!(delta.email, "bob@x.com");
        assert_eq!(delta.delta_type, "left");
    }

    #[test]
    fn test_parse_delta_rejects_missing_email() {
        let payload = br#"{"orgId": "acme", "email": "  ", "deltaType": "left"}"#;
        assert!(DeltaEvent::parse(payload).is_err());
    }
}
