//! Typed document models and path layout.
//!
//! Collection layout:
//! - `organizations/{orgId}`: one document per organization.
//! - `organizations/{orgId}/employees/{employeeId}`: employee documents,
//!   system-assigned ids, logically keyed by normalized email.

pub mod employee;
pub mod organization;

pub use employee::{EmployeeDoc, EmployeeUpsert};
pub use organization::OrganizationDoc;

use rostra_core::{EmployeeId, OrgId};

use crate::document::DocPath;

/// Root collection of organization documents.
pub const ORGANIZATIONS: &str = "organizations";

/// Path of an organization document.
#[must_use]
pub fn org_path(org: &OrgId) -> DocPath {
    DocPath::new(ORGANIZATIONS, org.as_str())
}

/// Collection path of an organization's employees.
#[must_use]
pub fn employees_collection(org: &OrgId) -> String {
    format!("{ORGANIZATIONS}/{}/employees", org.as_str())
}

/// Path of an employee document.
#[must_use]
pub fn employee_path(org: &OrgId, id: &EmployeeId) -> DocPath {
    DocPath::new(&employees_collection(org), &id.to_string())
}
