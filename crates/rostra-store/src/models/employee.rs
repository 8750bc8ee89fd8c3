//! Employee document model.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use rostra_core::{EmployeeId, EventId, EmployeeStatus, SourceTag};

use crate::document::{Document, FieldMap};

/// Field names of the employee document.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const STATUS_IN_ORG: &str = "status_in_org";
    pub const PRESENT_IN_LATEST: &str = "present_in_latest";
    pub const LAST_SEEN_EPOCH: &str = "last_seen_epoch";
    pub const SOURCE: &str = "source";
    pub const LAST_EVENT_ID: &str = "last_event_id";
}

/// A decoded employee document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeDoc {
    pub id: EmployeeId,
    pub email: String,
    pub status_in_org: EmployeeStatus,
    pub present_in_latest: bool,
    pub last_seen_epoch: i64,
    pub source: String,
    pub last_event_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeDoc {
    /// Decode from a raw document. Returns `None` when the document lacks an
    /// email or a parsable id, which indicates corruption rather than a
    /// recoverable state.
    #[must_use]
    pub fn from_document(doc: &Document) -> Option<Self> {
        let id: EmployeeId = doc.path.doc_id().parse().ok()?;
        let email = doc.get_str(fields::EMAIL)?.to_string();
        let status_in_org = doc
            .get_str(fields::STATUS_IN_ORG)
            .and_then(EmployeeStatus::from_stored)
            .unwrap_or(EmployeeStatus::Active);
        Some(Self {
            id,
            email,
            status_in_org,
            present_in_latest: doc.get_bool(fields::PRESENT_IN_LATEST).unwrap_or(false),
            last_seen_epoch: doc.get_i64(fields::LAST_SEEN_EPOCH).unwrap_or(0),
            source: doc.get_str(fields::SOURCE).unwrap_or_default().to_string(),
            last_event_id: doc.get_str(fields::LAST_EVENT_ID).map(ToString::to_string),
            updated_at: doc.updated_at,
        })
    }
}

/// Prepared fields for one upsert write. The reconciler composes these after
/// dedup and document resolution; existing documents take a set-merge, new
/// ones a create with a fresh id.
#[derive(Debug, Clone)]
pub struct EmployeeUpsert {
    pub email: String,
    pub status_in_org: EmployeeStatus,
    pub last_seen_epoch: i64,
    pub source: SourceTag,
    pub last_event_id: Option<EventId>,
}

impl EmployeeUpsert {
    /// Render the field map written by the reconciler. Always marks the
    /// employee as present in the latest snapshot.
    #[must_use]
    pub fn to_fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::EMAIL.to_string(), json!(self.email));
        map.insert(
            fields::STATUS_IN_ORG.to_string(),
            json!(self.status_in_org.as_str()),
        );
        map.insert(fields::PRESENT_IN_LATEST.to_string(), json!(true));
        map.insert(
            fields::LAST_SEEN_EPOCH.to_string(),
            json!(self.last_seen_epoch),
        );
        map.insert(fields::SOURCE.to_string(), json!(self.source.render()));
        if let Some(event_id) = &self.last_event_id {
            map.insert(
                fields::LAST_EVENT_ID.to_string(),
                Value::String(event_id.as_str().to_string()),
            );
        }
        map
    }
}

/// Fields written by a delta transition.
#[must_use]
pub fn delta_fields(
    status: EmployeeStatus,
    present_in_latest: bool,
    source: SourceTag,
    event_id: Option<&EventId>,
) -> FieldMap {
    let mut map = FieldMap::new();
    map.insert(fields::STATUS_IN_ORG.to_string(), json!(status.as_str()));
    map.insert(
        fields::PRESENT_IN_LATEST.to_string(),
        json!(present_in_latest),
    );
    map.insert(fields::SOURCE.to_string(), json!(source.render()));
    if let Some(event_id) = event_id {
        map.insert(
            fields::LAST_EVENT_ID.to_string(),
            Value::String(event_id.as_str().to_string()),
        );
    }
    map
}

/// Fields written by the finalizer's absence sweep.
#[must_use]
pub fn absent_fields() -> FieldMap {
    let mut map = FieldMap::new();
    map.insert(fields::PRESENT_IN_LATEST.to_string(), json!(false));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocPath;
    use rostra_core::{IngestChannel, IngestKind};

    #[test]
    fn test_upsert_fields_mark_present() {
        let upsert = EmployeeUpsert {
            email: "a@x.com".to_string(),
            status_in_org: EmployeeStatus::Left,
            last_seen_epoch: 4,
            source: SourceTag::new(IngestChannel::Kafka, IngestKind::Upsert),
            last_event_id: EventId::new("evt-1"),
        };
        let map = upsert.to_fields();
        assert_eq!(map.get(fields::PRESENT_IN_LATEST), Some(&json!(true)));
        assert_eq!(map.get(fields::STATUS_IN_ORG), Some(&json!("left")));
        assert_eq!(map.get(fields::LAST_SEEN_EPOCH), Some(&json!(4)));
        assert_eq!(map.get(fields::SOURCE), Some(&json!("kafka:upsert")));
        assert_eq!(map.get(fields::LAST_EVENT_ID), Some(&json!("evt-1")));
    }

    #[test]
    fn test_upsert_fields_omit_missing_event_id() {
        let upsert = EmployeeUpsert {
            email: "a@x.com".to_string(),
            status_in_org: EmployeeStatus::Active,
            last_seen_epoch: 1,
            source: SourceTag::new(IngestChannel::Email, IngestKind::Upsert),
            last_event_id: None,
        };
        assert!(!upsert.to_fields().contains_key(fields::LAST_EVENT_ID));
    }

    #[test]
    fn test_from_document_roundtrip() {
        let id = EmployeeId::new();
        let upsert = EmployeeUpsert {
            email: "a@x.com".to_string(),
            status_in_org: EmployeeStatus::Inactive,
            last_seen_epoch: 2,
            source: SourceTag::new(IngestChannel::Kafka, IngestKind::Upsert),
            last_event_id: None,
        };
        let doc = Document {
            path: DocPath::new("organizations/acme/employees", &id.to_string()),
            fields: upsert.to_fields(),
            updated_at: Utc::now(),
        };
        let employee = EmployeeDoc::from_document(&doc).unwrap();
        assert_eq!(employee.id, id);
        assert_eq!(employee.email, "a@x.com");
        assert_eq!(employee.status_in_org, EmployeeStatus::Inactive);
        assert!(employee.present_in_latest);
        assert_eq!(employee.last_seen_epoch, 2);
        assert_eq!(employee.source, "kafka:upsert");
    }

    #[test]
    fn test_from_document_requires_email() {
        let doc = Document {
            path: DocPath::new(
                "organizations/acme/employees",
                &EmployeeId::new().to_string(),
            ),
            fields: FieldMap::new(),
            updated_at: Utc::now(),
        };
        assert!(EmployeeDoc::from_document(&doc).is_none());
    }
}
