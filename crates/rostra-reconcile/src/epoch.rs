//! Epoch manager: allocates run epochs.

use tracing::{info, instrument};

use rostra_core::OrgId;
use rostra_store::models::OrganizationDoc;
use rostra_store::repo::OrgRepository;

use crate::error::ReconcileResult;

/// Owns the run lifecycle for organizations.
///
/// `begin_run` is deliberately not transactional: two racing calls for the
/// same organization may allocate the same epoch, and their runs merge into
/// one. `last_seen_epoch` is a high-water mark, so the data model tolerates
/// this; callers needing linearizable allocation must serialize externally.
#[derive(Clone)]
pub struct EpochManager {
    orgs: OrgRepository,
}

impl EpochManager {
    /// Create a manager over the organization repository.
    pub fn new(orgs: OrgRepository) -> Self {
        Self { orgs }
    }

    /// Allocate the next epoch for an organization, treating a missing
    /// organization document as epoch 0. Returns the new epoch.
    #[instrument(skip(self), fields(org = %org))]
    pub async fn begin_run(&self, org: &OrgId, name: Option<&str>) -> ReconcileResult<i64> {
        let current = self
            .orgs
            .get(org)
            .await?
            .map_or(0, |doc| doc.current_epoch);
        let epoch = current + 1;
        self.orgs
            .merge(org, OrganizationDoc::begin_run_fields(epoch, name))
            .await?;
        info!(epoch, "run started");
        Ok(epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostra_store::MemoryStore;
    use std::sync::Arc;

    fn manager() -> (EpochManager, OrgRepository) {
        let store = Arc::new(MemoryStore::new());
        let orgs = OrgRepository::new(store);
        (EpochManager::new(orgs.clone()), orgs)
    }

    #[tokio::test]
    async fn test_first_run_is_epoch_one() {
        let (mgr, orgs) = manager();
        let org = OrgId::new("acme").unwrap();
        assert_eq!(mgr.begin_run(&org, None).await.unwrap(), 1);

        let doc = orgs.get(&org).await.unwrap().unwrap();
        assert_eq!(doc.current_epoch, 1);
        assert_eq!(doc.last_finalized_epoch, 0);
    }

    #[tokio::test]
    async fn test_epochs_increase_by_one() {
        let (mgr, _) = manager();
        let org = OrgId::new("acme").unwrap();
        assert_eq!(mgr.begin_run(&org, None).await.unwrap(), 1);
        assert_eq!(mgr.begin_run(&org, None).await.unwrap(), 2);
        assert_eq!(mgr.begin_run(&org, Some("Acme")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_name_is_merged_not_cleared() {
        let (mgr, orgs) = manager();
        let org = OrgId::new("acme").unwrap();
        mgr.begin_run(&org, Some("Acme Corp")).await.unwrap();
        mgr.begin_run(&org, None).await.unwrap();
        let doc = orgs.get(&org).await.unwrap().unwrap();
        assert_eq!(doc.name.as_deref(), Some("Acme Corp"));
    }
}
