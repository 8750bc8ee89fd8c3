//! Organization document model.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::document::{Document, FieldMap};

/// Field names of the organization document.
pub mod fields {
    pub const CURRENT_EPOCH: &str = "current_epoch";
    pub const LAST_FINALIZED_EPOCH: &str = "last_finalized_epoch";
    pub const NAME: &str = "name";
}

/// An organization's reconciliation state.
///
/// `current_epoch` starts at 0 (no run yet) and increases by exactly one per
/// `begin_run`; `last_finalized_epoch` never exceeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationDoc {
    pub current_epoch: i64,
    pub last_finalized_epoch: i64,
    pub name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationDoc {
    /// Decode from a raw document. Missing numeric fields read as 0, so a
    /// partially-written organization document is still usable.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            current_epoch: doc.get_i64(fields::CURRENT_EPOCH).unwrap_or(0),
            last_finalized_epoch: doc.get_i64(fields::LAST_FINALIZED_EPOCH).unwrap_or(0),
            name: doc.get_str(fields::NAME).map(ToString::to_string),
            updated_at: doc.updated_at,
        }
    }

    /// Fields written by `begin_run`: the new epoch plus an optional display
    /// name, merged over whatever else the document holds.
    #[must_use]
    pub fn begin_run_fields(new_epoch: i64, name: Option<&str>) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::CURRENT_EPOCH.to_string(), json!(new_epoch));
        if let Some(name) = name {
            map.insert(fields::NAME.to_string(), Value::String(name.to_string()));
        }
        map
    }

    /// Fields written by `finalize_run`.
    #[must_use]
    pub fn finalize_fields(epoch: i64) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::CURRENT_EPOCH.to_string(), json!(epoch));
        map.insert(fields::LAST_FINALIZED_EPOCH.to_string(), json!(epoch));
        map
    }
}
