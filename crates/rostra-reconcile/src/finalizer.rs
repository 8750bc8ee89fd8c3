//! Finalizer: the post-snapshot absence sweep.
//!
//! After an upsert epoch completes, every employee still marked present
//! whose `last_seen_epoch` is below the finalized epoch was absent from the
//! snapshot and gets `present_in_latest=false`. The sweep pages through the
//! matching documents by cursor; each page's updates are committed in
//! batches within the store's atomic limit. Re-running a finalize is a no-op
//! because the sweep predicate no longer matches anything.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use rostra_core::OrgId;
use rostra_store::models::employee::absent_fields;
use rostra_store::models::OrganizationDoc;
use rostra_store::query::Cursor;
use rostra_store::repo::{EmployeeRepository, OrgRepository};
use rostra_store::{DocumentStore, WriteBatch, MAX_BATCH_OPS};

use rostra_store::models::employee::fields as employee_fields;

use crate::error::ReconcileResult;

/// Result of one finalize sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeOutcome {
    /// Employees flipped to `present_in_latest=false`.
    pub marked_absent: usize,
}

/// Runs the absence sweep and pins the organization's finalized epoch.
#[derive(Clone)]
pub struct Finalizer {
    store: Arc<dyn DocumentStore>,
    employees: EmployeeRepository,
    orgs: OrgRepository,
    page_size: usize,
}

impl Finalizer {
    /// Create a finalizer with the given sweep page size.
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            employees: EmployeeRepository::new(store.clone()),
            orgs: OrgRepository::new(store.clone()),
            store,
            page_size,
        }
    }

    /// Mark every employee not seen in `epoch` as absent, then record the
    /// epoch as finalized on the organization document.
    ///
    /// Finalizing an epoch older than `last_finalized_epoch` is the caller's
    /// contract violation; the sweep itself is harmless but the org document
    /// would move backwards.
    #[instrument(skip(self), fields(org = %org, epoch))]
    pub async fn finalize(&self, org: &OrgId, epoch: i64) -> ReconcileResult<FinalizeOutcome> {
        let mut outcome = FinalizeOutcome::default();
        let mut cursor: Option<Cursor> = None;

        loop {
            let page = self
                .employees
                .stale_page(org, epoch, self.page_size, cursor.take())
                .await?;
            if page.is_empty() {
                break;
            }

            // Page size may exceed the store's atomic batch limit; split.
            for group in page.chunks(MAX_BATCH_OPS) {
                let mut batch = WriteBatch::new();
                for doc in group {
                    batch.update(doc.path.clone(), absent_fields());
                }
                self.store.commit(batch).await?;
            }
            outcome.marked_absent += page.len();

            if page.len() < self.page_size {
                break;
            }
            cursor = page
                .last()
                .map(|doc| Cursor::after(doc, employee_fields::LAST_SEEN_EPOCH));
        }

        self.orgs
            .merge(org, OrganizationDoc::finalize_fields(epoch))
            .await?;

        info!(marked_absent = outcome.marked_absent, "run finalized");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostra_core::{EmployeeId, EmployeeStatus, IngestChannel, IngestKind, SourceTag};
    use rostra_store::models::{employee_path, EmployeeUpsert};
    use rostra_store::MemoryStore;

    async fn seed(store: &MemoryStore, org: &OrgId, email: &str, epoch: i64) {
        let upsert = EmployeeUpsert {
            email: email.to_string(),
            status_in_org: EmployeeStatus::Active,
            last_seen_epoch: epoch,
            source: SourceTag::new(IngestChannel::Kafka, IngestKind::Upsert),
            last_event_id: None,
        };
        store
            .set(
                &employee_path(org, &EmployeeId::new()),
                upsert.to_fields(),
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_marks_stale_employees_absent() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        seed(&store, &org, "stale@x.com", 1).await;
        seed(&store, &org, "fresh@x.com", 2).await;

        let finalizer = Finalizer::new(store.clone(), 1000);
        let outcome = finalizer.finalize(&org, 2).await.unwrap();
        assert_eq!(outcome.marked_absent, 1);

        let employees = EmployeeRepository::new(store.clone());
        let stale = employees
            .find_by_email(&org, "stale@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!stale.present_in_latest);
        // Status is untouched by the sweep.
        assert_eq!(stale.status_in_org, EmployeeStatus::Active);
        assert_eq!(stale.last_seen_epoch, 1);

        let fresh = employees
            .find_by_email(&org, "fresh@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(fresh.present_in_latest);

        let org_doc = OrgRepository::new(store).get(&org).await.unwrap().unwrap();
        assert_eq!(org_doc.current_epoch, 2);
        assert_eq!(org_doc.last_finalized_epoch, 2);
    }

    #[tokio::test]
    async fn test_finalize_twice_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        seed(&store, &org, "stale@x.com", 1).await;

        let finalizer = Finalizer::new(store, 1000);
        let first = finalizer.finalize(&org, 2).await.unwrap();
        assert_eq!(first.marked_absent, 1);
        let second = finalizer.finalize(&org, 2).await.unwrap();
        assert_eq!(second.marked_absent, 0);
    }

    #[tokio::test]
    async fn test_paginates_with_full_last_page() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        // Exactly two full pages at page_size 3.
        for i in 0..6 {
            seed(&store, &org, &format!("u{i}@x.com"), 1).await;
        }

        let finalizer = Finalizer::new(store, 3);
        let outcome = finalizer.finalize(&org, 2).await.unwrap();
        assert_eq!(outcome.marked_absent, 6);
    }

    #[tokio::test]
    async fn test_empty_org_finalizes_cleanly() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        let finalizer = Finalizer::new(store.clone(), 1000);
        let outcome = finalizer.finalize(&org, 1).await.unwrap();
        assert_eq!(outcome.marked_absent, 0);

        let org_doc = OrgRepository::new(store).get(&org).await.unwrap().unwrap();
        assert_eq!(org_doc.last_finalized_epoch, 1);
    }
}
