//! Documents and paths.

use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

/// A document's field map. Flat JSON object; nested values are opaque to the
/// store (merge is shallow, matching the target database's semantics).
pub type FieldMap = Map<String, Value>;

/// Slash-separated document path, alternating collection and document ids:
/// `organizations/{org}` or `organizations/{org}/employees/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Build a path from a collection path and a document id.
    #[must_use]
    pub fn new(collection: &str, doc_id: &str) -> Self {
        Self(format!("{collection}/{doc_id}"))
    }

    /// Parse a raw path string. Must have an even number of non-empty
    /// segments (collection/doc pairs).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.is_empty()
            || segments.len() % 2 != 0
            || segments.iter().any(|s| s.is_empty())
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// The full path string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection path this document lives in.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// The final path segment: the document id.
    #[must_use]
    pub fn doc_id(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document snapshot: path, fields, and the store-assigned update time.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: DocPath,
    pub fields: FieldMap,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Read a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Read an integer field.
    #[must_use]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    /// Read a boolean field.
    #[must_use]
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_components() {
        let path = DocPath::new("organizations/acme/employees", "e-1");
        assert_eq!(path.as_str(), "organizations/acme/employees/e-1");
        assert_eq!(path.collection(), "organizations/acme/employees");
        assert_eq!(path.doc_id(), "e-1");
    }

    #[test]
    fn test_parse_rejects_odd_or_empty_segments() {
        assert!(DocPath::parse("organizations/acme").is_some());
        assert!(DocPath::parse("organizations").is_none());
        assert!(DocPath::parse("organizations/acme/employees").is_none());
        assert!(DocPath::parse("organizations//x/y").is_none());
        assert!(DocPath::parse("").is_none());
    }
}
