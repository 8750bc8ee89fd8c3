//! Employee repository.
//!
//! One call here is one store round-trip. Chunking email lookups to the
//! store's `in`-operand limit and running chunks in parallel is the
//! reconciler's job, not the repository's.

use std::sync::Arc;

use serde_json::{json, Value};

use rostra_core::OrgId;

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::models::employee::fields;
use crate::models::{employees_collection, EmployeeDoc};
use crate::query::{Cursor, Filter, Query};
use crate::store::{DocumentStore, MAX_IN_OPERANDS};

/// Typed access to employee documents.
#[derive(Clone)]
pub struct EmployeeRepository {
    store: Arc<dyn DocumentStore>,
}

impl EmployeeRepository {
    /// Create a repository over a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up one employee by normalized email.
    pub async fn find_by_email(
        &self,
        org: &OrgId,
        email: &str,
    ) -> StoreResult<Option<EmployeeDoc>> {
        let query = Query::collection(employees_collection(org))
            .filter(Filter::eq(fields::EMAIL, email))
            .limit(1);
        let docs = self.store.run_query(&query).await?;
        Ok(docs.first().and_then(EmployeeDoc::from_document))
    }

    /// Look up up to [`MAX_IN_OPERANDS`] employees by email in one query.
    pub async fn find_by_emails(
        &self,
        org: &OrgId,
        emails: &[String],
    ) -> StoreResult<Vec<EmployeeDoc>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        if emails.len() > MAX_IN_OPERANDS {
            return Err(StoreError::InQueryTooLarge {
                len: emails.len(),
                max: MAX_IN_OPERANDS,
            });
        }
        let operands: Vec<Value> = emails.iter().map(|e| json!(e)).collect();
        let query = Query::collection(employees_collection(org))
            .filter(Filter::is_in(fields::EMAIL, operands));
        let docs = self.store.run_query(&query).await?;
        Ok(docs.iter().filter_map(EmployeeDoc::from_document).collect())
    }

    /// One page of employees still marked present whose `last_seen_epoch` is
    /// below `epoch`, ordered by `last_seen_epoch`. Returns raw documents so
    /// the caller can derive the next cursor from the last one.
    pub async fn stale_page(
        &self,
        org: &OrgId,
        epoch: i64,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> StoreResult<Vec<Document>> {
        let mut query = Query::collection(employees_collection(org))
            .filter(Filter::eq(fields::PRESENT_IN_LATEST, true))
            .filter(Filter::lt(fields::LAST_SEEN_EPOCH, epoch))
            .order_by(fields::LAST_SEEN_EPOCH)
            .limit(page_size);
        if let Some(cursor) = cursor {
            query = query.start_after(cursor);
        }
        self.store.run_query(&query).await
    }
}
