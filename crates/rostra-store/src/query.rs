//! Query model: filters, ordering, pagination cursors.

use serde_json::Value;
use std::cmp::Ordering;

use crate::document::{DocPath, Document};

/// Comparison operators supported by the store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals the operand.
    Eq,
    /// Field is strictly less than the operand.
    Lt,
    /// Field equals one of the operands (array value).
    In,
}

/// A single field filter.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// `field < value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Lt,
            value: value.into(),
        }
    }

    /// `field in values`.
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: Value::Array(values),
        }
    }

    /// Evaluate this filter against a document.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.fields.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Lt => {
                matches!(compare_values(actual, &self.value), Some(Ordering::Less))
            }
            FilterOp::In => match &self.value {
                Value::Array(options) => options.iter().any(|v| v == actual),
                _ => false,
            },
        }
    }
}

/// Pagination cursor: the last document of the previous page, reduced to its
/// order-field value and path for a strict `(order_value, path)` comparison.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub order_value: Value,
    pub path: DocPath,
}

impl Cursor {
    /// Derive a cursor from the last document of a page.
    #[must_use]
    pub fn after(doc: &Document, order_by: &str) -> Self {
        Self {
            order_value: doc.fields.get(order_by).cloned().unwrap_or(Value::Null),
            path: doc.path.clone(),
        }
    }
}

/// A query against one collection.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
    pub limit: Option<usize>,
    pub start_after: Option<Cursor>,
}

impl Query {
    /// Start a query over a collection path.
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
            start_after: None,
        }
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order ascending by a field. Documents missing the field are excluded,
    /// matching the target database's behavior.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Cap the number of returned documents.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the given cursor. Requires `order_by`.
    #[must_use]
    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

/// Total order over the JSON scalar types the store indexes: null < bool <
/// number < string. Arrays and objects are not comparable.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    fn rank(v: &Value) -> Option<u8> {
        match v {
            Value::Null => Some(0),
            Value::Bool(_) => Some(1),
            Value::Number(_) => Some(2),
            Value::String(_) => Some(3),
            _ => None,
        }
    }

    let (ra, rb) = (rank(a)?, rank(b)?);
    if ra != rb {
        return Some(ra.cmp(&rb));
    }
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().partial_cmp(&y.as_f64())
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
