//! Ingestion message types consumed by the engine.

use serde::{Deserialize, Serialize};

use rostra_core::{normalize_email, normalize_status, EmployeeStatus, EventId};

/// One raw upsert row as delivered by a bridge batch or a decoded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertMessage {
    /// Employee email, any casing/whitespace.
    pub email: String,
    /// Free-form status string; normalized on intake.
    #[serde(default)]
    pub status_in_org: Option<String>,
    /// Source event the row belongs to.
    #[serde(default)]
    pub event_id: Option<String>,
}

impl UpsertMessage {
    /// Normalize into the engine's working form. Returns `None` when the
    /// email is invalid after normalization (the row is skipped).
    #[must_use]
    pub fn normalize(&self) -> Option<NormalizedUpsert> {
        let email = normalize_email(&self.email);
        if !rostra_core::is_valid_email(&email) {
            return None;
        }
        Some(NormalizedUpsert {
            email,
            status: normalize_status(self.status_in_org.as_deref()),
            event_id: self.event_id.as_deref().and_then(EventId::new),
        })
    }
}

/// An upsert row after normalization and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUpsert {
    pub email: String,
    pub status: EmployeeStatus,
    pub event_id: Option<EventId>,
}

/// Status transition applied by a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaType {
    /// Employee has left: `status=left`, `present_in_latest=false`.
    Left,
    /// Employee is inactive: `status=inactive`, `present_in_latest=false`.
    Inactive,
    /// Employee is back: `status=active`, `present_in_latest=true`.
    Reactivated,
}

impl DeltaType {
    /// Parse the wire form. Unknown values are a skip, not an error.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "inactive" => Some(Self::Inactive),
            "reactivated" => Some(Self::Reactivated),
            _ => None,
        }
    }

    /// The `(status_in_org, present_in_latest)` pair this delta writes.
    #[must_use]
    pub fn transition(&self) -> (EmployeeStatus, bool) {
        match self {
            Self::Left => (EmployeeStatus::Left, false),
            Self::Inactive => (EmployeeStatus::Inactive, false),
            Self::Reactivated => (EmployeeStatus::Active, true),
        }
    }
}

/// One raw delta message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaMessage {
    /// Employee email, any casing/whitespace.
    pub email: String,
    /// Wire delta type; unknown values are skipped.
    pub delta_type: String,
    /// Source event the delta belongs to.
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Counts returned by delta processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeltaOutcome {
    pub processed: usize,
    pub skipped: usize,
}
