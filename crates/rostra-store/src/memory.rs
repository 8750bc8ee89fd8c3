//! In-memory document store.
//!
//! Backs tests and single-node runs. Implements the full query surface,
//! including ordering, cursors, and the `in`-operand limit, with the same
//! semantics the Postgres backend provides.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::document::{DocPath, Document, FieldMap};
use crate::error::{StoreError, StoreResult};
use crate::query::{compare_values, FilterOp, Query};
use crate::store::{DocumentStore, WriteBatch, WriteOp, MAX_IN_OPERANDS};

#[derive(Debug, Clone)]
struct StoredDoc {
    fields: FieldMap,
    updated_at: DateTime<Utc>,
}

/// In-memory [`DocumentStore`] keyed by full document path.
///
/// A `BTreeMap` keeps collection scans ordered by path, which makes cursor
/// tie-breaking deterministic.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    docs: Arc<RwLock<BTreeMap<String, StoredDoc>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (all collections). Test helper.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    fn apply_op(docs: &mut BTreeMap<String, StoredDoc>, op: WriteOp) -> StoreResult<()> {
        let now = Utc::now();
        match op {
            WriteOp::Set {
                path,
                fields,
                merge,
            } => {
                let key = path.as_str().to_string();
                match docs.get_mut(&key) {
                    Some(existing) if merge => {
                        for (k, v) in fields {
                            existing.fields.insert(k, v);
                        }
                        existing.updated_at = now;
                    }
                    _ => {
                        docs.insert(
                            key,
                            StoredDoc {
                                fields,
                                updated_at: now,
                            },
                        );
                    }
                }
                Ok(())
            }
            WriteOp::Update { path, fields } => {
                let Some(existing) = docs.get_mut(path.as_str()) else {
                    return Err(StoreError::NotFound {
                        path: path.as_str().to_string(),
                    });
                };
                for (k, v) in fields {
                    existing.fields.insert(k, v);
                }
                existing.updated_at = now;
                Ok(())
            }
        }
    }

    async fn eval_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        for filter in &query.filters {
            if filter.op == FilterOp::In {
                let len = filter.value.as_array().map_or(0, Vec::len);
                if len > MAX_IN_OPERANDS {
                    return Err(StoreError::InQueryTooLarge {
                        len,
                        max: MAX_IN_OPERANDS,
                    });
                }
            }
        }
        if query.start_after.is_some() && query.order_by.is_none() {
            return Err(StoreError::InvalidQuery {
                message: "start_after requires order_by".to_string(),
            });
        }

        let docs = self.docs.read().await;
        let prefix = format!("{}/", query.collection);

        let mut matched: Vec<Document> = docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            // Only direct children: no further '/' after the prefix.
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .filter_map(|(path, stored)| {
                let doc = Document {
                    path: DocPath::parse(path)?,
                    fields: stored.fields.clone(),
                    updated_at: stored.updated_at,
                };
                query.filters.iter().all(|f| f.matches(&doc)).then_some(doc)
            })
            .collect();

        if let Some(order_by) = &query.order_by {
            // Documents missing the order field are excluded from ordered
            // queries, matching the backing database's index behavior.
            matched.retain(|d| d.fields.contains_key(order_by));
            matched.sort_by(|a, b| {
                let va = a.fields.get(order_by).unwrap_or(&Value::Null);
                let vb = b.fields.get(order_by).unwrap_or(&Value::Null);
                compare_values(va, vb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.path.cmp(&b.path))
            });

            if let Some(cursor) = &query.start_after {
                matched.retain(|d| {
                    let v = d.fields.get(order_by).unwrap_or(&Value::Null);
                    match compare_values(v, &cursor.order_value) {
                        Some(std::cmp::Ordering::Greater) => true,
                        Some(std::cmp::Ordering::Equal) => d.path > cursor.path,
                        _ => false,
                    }
                });
            }
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(docs.get(path.as_str()).map(|stored| Document {
            path: path.clone(),
            fields: stored.fields.clone(),
            updated_at: stored.updated_at,
        }))
    }

    async fn set(&self, path: &DocPath, fields: FieldMap, merge: bool) -> StoreResult<()> {
        let mut docs = self.docs.write().await;
        Self::apply_op(
            &mut docs,
            WriteOp::Set {
                path: path.clone(),
                fields,
                merge,
            },
        )
    }

    async fn update(&self, path: &DocPath, fields: FieldMap) -> StoreResult<()> {
        let mut docs = self.docs.write().await;
        Self::apply_op(
            &mut docs,
            WriteOp::Update {
                path: path.clone(),
                fields,
            },
        )
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.eval_query(query).await
    }

    async fn count(&self, query: &Query) -> StoreResult<usize> {
        Ok(self.eval_query(query).await?.len())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let ops = batch.into_ops()?;
        let mut docs = self.docs.write().await;

        // All-or-nothing: validate updates against the current state before
        // applying anything.
        for op in &ops {
            if let WriteOp::Update { path, .. } = op {
                if !docs.contains_key(path.as_str()) {
                    return Err(StoreError::NotFound {
                        path: path.as_str().to_string(),
                    });
                }
            }
        }
        for op in ops {
            Self::apply_op(&mut docs, op)?;
        }
        Ok(())
    }
}
