//! Organization repository.

use std::sync::Arc;

use rostra_core::OrgId;

use crate::document::FieldMap;
use crate::error::StoreResult;
use crate::models::{org_path, OrganizationDoc};
use crate::store::DocumentStore;

/// Typed access to organization documents.
#[derive(Clone)]
pub struct OrgRepository {
    store: Arc<dyn DocumentStore>,
}

impl OrgRepository {
    /// Create a repository over a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read an organization document. `Ok(None)` when it does not exist,
    /// which callers treat as epoch 0.
    pub async fn get(&self, org: &OrgId) -> StoreResult<Option<OrganizationDoc>> {
        let doc = self.store.get(&org_path(org)).await?;
        Ok(doc.as_ref().map(OrganizationDoc::from_document))
    }

    /// Merge fields into an organization document, creating it if absent.
    pub async fn merge(&self, org: &OrgId, fields: FieldMap) -> StoreResult<()> {
        self.store.set(&org_path(org), fields, true).await
    }
}
