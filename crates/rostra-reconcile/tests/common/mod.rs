//! Shared helpers for reconciliation integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use rostra_reconcile::{ReconcileConfig, RosterService, UpsertMessage};
use rostra_store::{
    DocPath, Document, DocumentStore, FieldMap, MemoryStore, Query, StoreError, StoreResult,
    WriteBatch,
};

/// Store wrapper that fails batch commits while the switch is on. Lets tests
/// drive the circuit breaker and adaptive batch sizing.
pub struct FlakyStore {
    inner: MemoryStore,
    fail_commits: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_commits: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.inner.get(path).await
    }

    async fn set(&self, path: &DocPath, fields: FieldMap, merge: bool) -> StoreResult<()> {
        self.inner.set(path, fields, merge).await
    }

    async fn update(&self, path: &DocPath, fields: FieldMap) -> StoreResult<()> {
        self.inner.update(path, fields).await
    }

    async fn run_query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.inner.run_query(query).await
    }

    async fn count(&self, query: &Query) -> StoreResult<usize> {
        self.inner.count(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("injected commit failure"));
        }
        self.inner.commit(batch).await
    }
}

/// Service over a fresh in-memory store with default tuning.
pub fn service() -> (RosterService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (
        RosterService::new(store.clone(), ReconcileConfig::default()),
        store,
    )
}

pub fn upsert(email: &str, status: &str) -> UpsertMessage {
    UpsertMessage {
        email: email.to_string(),
        status_in_org: Some(status.to_string()),
        event_id: Some("evt-test".to_string()),
    }
}
