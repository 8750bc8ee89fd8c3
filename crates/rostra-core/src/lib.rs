//! # rostra-core
//!
//! Shared types for the Rostra roster reconciliation service.
//!
//! Provides the strongly typed identifiers, the canonical employee status
//! model with its free-form normalizer, email normalization/validation, and
//! the provenance tags written to every employee document.

pub mod email;
pub mod ids;
pub mod source;
pub mod status;

pub use email::{is_valid_email, normalize_email};
pub use ids::{EmployeeId, EventId, OrgId};
pub use source::{IngestChannel, IngestKind, SourceTag};
pub use status::{normalize_status, EmployeeStatus};
