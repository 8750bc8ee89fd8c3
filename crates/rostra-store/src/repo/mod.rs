//! Typed repositories over the raw store primitives.

pub mod employees;
pub mod orgs;

pub use employees::EmployeeRepository;
pub use orgs::OrgRepository;
