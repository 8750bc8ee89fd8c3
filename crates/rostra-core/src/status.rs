//! Canonical employee status and the free-form status normalizer.
//!
//! Upstream feeds carry whatever a customer's HR export produces: "Employed",
//! "on leave", "TERMINATED", "full-time"... The store only knows three
//! states. Matching is case-insensitive, exact first, then substring against
//! the vocabulary. Empty input defaults to active; unknown non-empty input
//! defaults to inactive.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Canonical employment status within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    /// Currently employed in some capacity (including contractors, interns).
    Active,
    /// Employed but not currently working (leave, sabbatical, suspension).
    Inactive,
    /// No longer with the organization.
    Left,
}

impl EmployeeStatus {
    /// The stored string form (`active`, `inactive`, `left`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Left => "left",
        }
    }

    /// Parse the stored string form. Only accepts the three canonical values.
    #[must_use]
    pub fn from_stored(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "left" => Some(Self::Left),
            _ => None,
        }
    }
}

impl Display for EmployeeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Vocabulary mapped to [`EmployeeStatus::Active`].
const ACTIVE_TERMS: &[&str] = &[
    "active",
    "employed",
    "current",
    "working",
    "full-time",
    "fulltime",
    "part-time",
    "parttime",
    "contractor",
    "consultant",
    "intern",
];

/// Vocabulary mapped to [`EmployeeStatus::Inactive`].
const INACTIVE_TERMS: &[&str] = &[
    "inactive",
    "on leave",
    "onleave",
    "leave",
    "sabbatical",
    "maternity",
    "paternity",
    "medical",
    "suspended",
];

/// Vocabulary mapped to [`EmployeeStatus::Left`].
const LEFT_TERMS: &[&str] = &[
    "left",
    "terminated",
    "former",
    "resigned",
    "retired",
    "departed",
    "exited",
    "quit",
    "fired",
    "removed",
];

/// Normalize a free-form status string to the canonical three-state model.
///
/// Matching is case-insensitive: exact vocabulary match first, then
/// substring match (so "Full-Time Employee" still resolves to active).
/// Empty or whitespace-only input defaults to active; unknown non-empty
/// input defaults to inactive.
///
/// Idempotent: normalizing an already-canonical value returns it unchanged.
#[must_use]
pub fn normalize_status(raw: Option<&str>) -> EmployeeStatus {
    let Some(raw) = raw else {
        return EmployeeStatus::Active;
    };
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return EmployeeStatus::Active;
    }

    for (terms, status) in [
        (ACTIVE_TERMS, EmployeeStatus::Active),
        (INACTIVE_TERMS, EmployeeStatus::Inactive),
        (LEFT_TERMS, EmployeeStatus::Left),
    ] {
        if terms.contains(&needle.as_str()) {
            return status;
        }
    }

    for (terms, status) in [
        (ACTIVE_TERMS, EmployeeStatus::Active),
        (INACTIVE_TERMS, EmployeeStatus::Inactive),
        (LEFT_TERMS, EmployeeStatus::Left),
    ] {
        if terms.iter().any(|t| needle.contains(t)) {
            return status;
        }
    }

    EmployeeStatus::Inactive
}
