//! Delta processor: in-order single-employee status transitions.
//!
//! Deltas never create employees and never touch `last_seen_epoch`, so they
//! can land at any point relative to snapshot runs without disturbing epoch
//! state. Messages are applied one at a time; per-employee ordering is the
//! producer's responsibility (key by email upstream).

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use rostra_core::{normalize_email, IngestChannel, IngestKind, OrgId, SourceTag};
use rostra_store::models::employee::delta_fields;
use rostra_store::models::employee_path;
use rostra_store::repo::EmployeeRepository;
use rostra_store::DocumentStore;

use crate::error::ReconcileResult;
use crate::types::{DeltaMessage, DeltaOutcome, DeltaType};

/// Applies delta transitions against the store.
#[derive(Clone)]
pub struct DeltaProcessor {
    store: Arc<dyn DocumentStore>,
    employees: EmployeeRepository,
}

impl DeltaProcessor {
    /// Create a processor over a store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            employees: EmployeeRepository::new(store.clone()),
            store,
        }
    }

    /// Apply a batch of deltas sequentially.
    ///
    /// Validation problems (bad email, unknown delta type, unknown employee)
    /// skip the message; store failures propagate so the caller can retry
    /// the idempotent batch.
    #[instrument(skip(self, messages), fields(org = %org, deltas = messages.len()))]
    pub async fn process(
        &self,
        org: &OrgId,
        messages: &[DeltaMessage],
        channel: IngestChannel,
    ) -> ReconcileResult<DeltaOutcome> {
        let mut outcome = DeltaOutcome::default();
        let source = SourceTag::new(channel, IngestKind::Delta);

        for message in messages {
            let email = normalize_email(&message.email);
            if !rostra_core::is_valid_email(&email) {
                debug!(email = %message.email, "skipping delta with invalid email");
                outcome.skipped += 1;
                continue;
            }
            let Some(delta_type) = DeltaType::parse(&message.delta_type) else {
                debug!(delta_type = %message.delta_type, "skipping delta with unknown type");
                outcome.skipped += 1;
                continue;
            };

            let Some(employee) = self.employees.find_by_email(org, &email).await? else {
                // Deltas never create employees.
                warn!(email = %email, "delta for unknown employee, skipping");
                outcome.skipped += 1;
                continue;
            };

            let (status, present) = delta_type.transition();
            let event_id = message.event_id.as_deref().and_then(rostra_core::EventId::new);
            self.store
                .update(
                    &employee_path(org, &employee.id),
                    delta_fields(status, present, source, event_id.as_ref()),
                )
                .await?;
            outcome.processed += 1;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostra_core::{EmployeeId, EmployeeStatus};
    use rostra_store::models::EmployeeUpsert;
    use rostra_store::MemoryStore;

    async fn seed(store: &MemoryStore, org: &OrgId, email: &str) -> EmployeeId {
        let id = EmployeeId::new();
        let upsert = EmployeeUpsert {
            email: email.to_string(),
            status_in_org: EmployeeStatus::Active,
            last_seen_epoch: 3,
            source: SourceTag::new(IngestChannel::Kafka, IngestKind::Upsert),
            last_event_id: None,
        };
        store
            .set(&employee_path(org, &id), upsert.to_fields(), false)
            .await
            .unwrap();
        id
    }

    fn delta(email: &str, delta_type: &str) -> DeltaMessage {
        DeltaMessage {
            email: email.to_string(),
            delta_type: delta_type.to_string(),
            event_id: Some("evt-d".to_string()),
        }
    }

    #[tokio::test]
    async fn test_left_delta_transition() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        seed(&store, &org, "a@x.com").await;

        let processor = DeltaProcessor::new(store.clone());
        let outcome = processor
            .process(&org, &[delta("a@x.com", "left")], IngestChannel::Kafka)
            .await
            .unwrap();
        assert_eq!(outcome, DeltaOutcome { processed: 1, skipped: 0 });

        let employee = EmployeeRepository::new(store)
            .find_by_email(&org, "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee.status_in_org, EmployeeStatus::Left);
        assert!(!employee.present_in_latest);
        // Epoch state untouched.
        assert_eq!(employee.last_seen_epoch, 3);
        assert_eq!(employee.source, "kafka:delta");
        assert_eq!(employee.last_event_id.as_deref(), Some("evt-d"));
    }

    #[tokio::test]
    async fn test_reactivated_delta_restores_presence() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        seed(&store, &org, "a@x.com").await;

        let processor = DeltaProcessor::new(store.clone());
        processor
            .process(&org, &[delta("a@x.com", "inactive")], IngestChannel::Email)
            .await
            .unwrap();
        processor
            .process(&org, &[delta("a@x.com", "reactivated")], IngestChannel::Email)
            .await
            .unwrap();

        let employee = EmployeeRepository::new(store)
            .find_by_email(&org, "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee.status_in_org, EmployeeStatus::Active);
        assert!(employee.present_in_latest);
        assert_eq!(employee.source, "email:delta");
    }

    #[tokio::test]
    async fn test_unknown_employee_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        let processor = DeltaProcessor::new(store);
        let outcome = processor
            .process(&org, &[delta("ghost@x.com", "left")], IngestChannel::Kafka)
            .await
            .unwrap();
        assert_eq!(outcome, DeltaOutcome { processed: 0, skipped: 1 });
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let org = OrgId::new("acme").unwrap();
        seed(&store, &org, "a@x.com").await;

        let processor = DeltaProcessor::new(store);
        let outcome = processor
            .process(
                &org,
                &[
                    delta("not-an-email", "left"),
                    delta("a@x.com", "promoted"),
                    delta("a@x.com", "left"),
                ],
                IngestChannel::Kafka,
            )
            .await
            .unwrap();
        assert_eq!(outcome, DeltaOutcome { processed: 1, skipped: 2 });
    }
}
