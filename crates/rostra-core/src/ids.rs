//! Strongly typed identifiers.
//!
//! Organizations and source events are identified by opaque strings assigned
//! upstream; employees carry a system-assigned UUID whose value is
//! irrelevant; the logical key of an employee is `(org, email)`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// Description of the failure.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Opaque organization identifier, assigned by the upstream directory.
///
/// Trimmed on construction; an empty value is invalid everywhere it is
/// consumed, so construction rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

impl OrgId {
    /// Create an organization id from an upstream value.
    ///
    /// Returns `None` when the trimmed value is empty.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrgId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s).ok_or(ParseIdError {
            id_type: "OrgId",
            message: "empty value".to_string(),
        })
    }
}

/// Opaque source-event identifier.
///
/// Scopes a snapshot: all upsert rows sharing one `EventId` belong to the
/// same snapshot and are applied with event-level idempotency downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create an event id from an upstream value.
    ///
    /// Returns `None` when the trimmed value is empty.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// System-assigned employee document id.
///
/// The physical id carries no meaning; the logical identity of an employee
/// is the organization-scoped normalized email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(Uuid);

impl EmployeeId {
    /// Creates a new random id using UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an id from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns a reference to the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EmployeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EmployeeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EmployeeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| ParseIdError {
            id_type: "EmployeeId",
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_id_trims_input() {
        let org = OrgId::new("  acme  ").unwrap();
        assert_eq!(org.as_str(), "acme");
    }

    #[test]
    fn test_org_id_rejects_empty() {
        assert!(OrgId::new("").is_none());
        assert!(OrgId::new("   ").is_none());
    }

    #[test]
    fn test_org_id_from_str() {
        let org: OrgId = "acme".parse().unwrap();
        assert_eq!(org.to_string(), "acme");
        assert!("  ".parse::<OrgId>().is_err());
    }

    #[test]
    fn test_event_id_rejects_empty() {
        assert!(EventId::new("").is_none());
        assert!(EventId::new("evt-1").is_some());
    }

    #[test]
    fn test_employee_id_roundtrip() {
        let id = EmployeeId::new();
        let parsed: EmployeeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_employee_id_serde_transparent() {
        let id = EmployeeId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
