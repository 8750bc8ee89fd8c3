//! Postgres-backed document store.
//!
//! Documents live in a single JSONB table keyed by path. Shallow field merge
//! maps to the `||` operator, `in` filters to a `jsonb_array_elements`
//! subquery, and atomic batches to a transaction. Field names are internal
//! constants, never caller input; they are still validated before being
//! spliced into SQL.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::document::{DocPath, Document, FieldMap};
use crate::error::{StoreError, StoreResult};
use crate::query::{FilterOp, Query};
use crate::store::{DocumentStore, WriteBatch, WriteOp, MAX_IN_OPERANDS};

/// Postgres [`DocumentStore`] backend.
#[derive(Clone)]
pub struct PgDocStore {
    pool: PgPool,
}

impl PgDocStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small dedicated pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the documents table and its collection index if missing.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                 path TEXT PRIMARY KEY,
                 collection TEXT NOT NULL,
                 fields JSONB NOT NULL DEFAULT '{}'::jsonb,
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> StoreResult<Document> {
        let path: String = row.try_get("path")?;
        let fields: serde_json::Value = row.try_get("fields")?;
        let updated_at: chrono::DateTime<chrono::Utc> = row.try_get("updated_at")?;
        let serde_json::Value::Object(fields) = fields else {
            return Err(StoreError::backend(format!(
                "non-object fields for document {path}"
            )));
        };
        let path = DocPath::parse(&path)
            .ok_or_else(|| StoreError::backend(format!("malformed document path {path}")))?;
        Ok(Document {
            path,
            fields,
            updated_at,
        })
    }

    /// Push the WHERE/ORDER clauses shared by `run_query` and `count`.
    fn push_query_clauses<'a>(
        qb: &mut QueryBuilder<'a, Postgres>,
        query: &'a Query,
        with_order: bool,
    ) -> StoreResult<()> {
        qb.push(" WHERE collection = ").push_bind(&query.collection);

        for filter in &query.filters {
            let field = checked_field(&filter.field)?;
            match filter.op {
                FilterOp::Eq => {
                    qb.push(format!(" AND fields->'{field}' = "))
                        .push_bind(filter.value.clone());
                }
                FilterOp::Lt => {
                    qb.push(format!(" AND fields->'{field}' < "))
                        .push_bind(filter.value.clone());
                }
                FilterOp::In => {
                    let len = filter.value.as_array().map_or(0, Vec::len);
                    if len > MAX_IN_OPERANDS {
                        return Err(StoreError::InQueryTooLarge {
                            len,
                            max: MAX_IN_OPERANDS,
                        });
                    }
                    qb.push(format!(
                        " AND fields->'{field}' IN (SELECT jsonb_array_elements("
                    ))
                    .push_bind(filter.value.clone())
                    .push("))");
                }
            }
        }

        if let Some(order_by) = &query.order_by {
            let field = checked_field(order_by)?;
            qb.push(format!(" AND jsonb_exists(fields, '{field}')"));

            if let Some(cursor) = &query.start_after {
                qb.push(format!(" AND (fields->'{field}', path) > ("))
                    .push_bind(cursor.order_value.clone())
                    .push(", ")
                    .push_bind(cursor.path.as_str().to_string())
                    .push(")");
            }
            if with_order {
                qb.push(format!(" ORDER BY fields->'{field}' ASC, path ASC"));
            }
        } else if query.start_after.is_some() {
            return Err(StoreError::InvalidQuery {
                message: "start_after requires order_by".to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let row = sqlx::query("SELECT path, fields, updated_at FROM documents WHERE path = $1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn set(&self, path: &DocPath, fields: FieldMap, merge: bool) -> StoreResult<()> {
        let sql = if merge {
            "INSERT INTO documents (path, collection, fields, updated_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (path) DO UPDATE
             SET fields = documents.fields || EXCLUDED.fields, updated_at = now()"
        } else {
            "INSERT INTO documents (path, collection, fields, updated_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (path) DO UPDATE
             SET fields = EXCLUDED.fields, updated_at = now()"
        };
        sqlx::query(sql)
            .bind(path.as_str())
            .bind(path.collection())
            .bind(serde_json::Value::Object(fields))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: FieldMap) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE documents SET fields = fields || $2, updated_at = now() WHERE path = $1")
                .bind(path.as_str())
                .bind(serde_json::Value::Object(fields))
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                path: path.as_str().to_string(),
            });
        }
        Ok(())
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT path, fields, updated_at FROM documents");
        Self::push_query_clauses(&mut qb, query, true)?;
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: &Query) -> StoreResult<usize> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS n FROM documents");
        Self::push_query_clauses(&mut qb, query, false)?;

        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as usize)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let ops = batch.into_ops()?;
        let mut tx = self.pool.begin().await?;

        for op in ops {
            match op {
                WriteOp::Set {
                    path,
                    fields,
                    merge,
                } => {
                    let sql = if merge {
                        "INSERT INTO documents (path, collection, fields, updated_at)
                         VALUES ($1, $2, $3, now())
                         ON CONFLICT (path) DO UPDATE
                         SET fields = documents.fields || EXCLUDED.fields, updated_at = now()"
                    } else {
                        "INSERT INTO documents (path, collection, fields, updated_at)
                         VALUES ($1, $2, $3, now())
                         ON CONFLICT (path) DO UPDATE
                         SET fields = EXCLUDED.fields, updated_at = now()"
                    };
                    sqlx::query(sql)
                        .bind(path.as_str())
                        .bind(path.collection())
                        .bind(serde_json::Value::Object(fields))
                        .execute(&mut *tx)
                        .await?;
                }
                WriteOp::Update { path, fields } => {
                    let result = sqlx::query(
                        "UPDATE documents SET fields = fields || $2, updated_at = now() WHERE path = $1",
                    )
                    .bind(path.as_str())
                    .bind(serde_json::Value::Object(fields))
                    .execute(&mut *tx)
                    .await?;
                    if result.rows_affected() == 0 {
                        // Dropping the transaction rolls the batch back.
                        return Err(StoreError::NotFound {
                            path: path.as_str().to_string(),
                        });
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Validate an internal field name before splicing it into SQL.
fn checked_field(field: &str) -> StoreResult<&str> {
    if !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(field)
    } else {
        Err(StoreError::InvalidQuery {
            message: format!("unsupported field name: {field:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_field() {
        assert!(checked_field("last_seen_epoch").is_ok());
        assert!(checked_field("email").is_ok());
        assert!(checked_field("bad'field").is_err());
        assert!(checked_field("").is_err());
        assert!(checked_field("semi;colon").is_err());
    }
}
