//! The roster service facade driven by the ingestion API.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::instrument;

use rostra_core::{IngestChannel, OrgId};
use rostra_store::repo::OrgRepository;
use rostra_store::DocumentStore;

use crate::cache::DocRefCache;
use crate::circuit::CircuitBreaker;
use crate::config::ReconcileConfig;
use crate::delta::DeltaProcessor;
use crate::epoch::EpochManager;
use crate::error::ReconcileResult;
use crate::finalizer::Finalizer;
use crate::reconciler::Reconciler;
use crate::types::{DeltaMessage, DeltaOutcome, UpsertMessage};

/// Report returned by an upsert ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// The epoch allocated for this ingestion.
    pub epoch: i64,
    /// Whether the epoch was finalized afterwards.
    pub finalized: bool,
    /// Wall-clock duration of the whole ingestion.
    pub duration_ms: u64,
}

/// Wires the epoch manager, reconciler, delta processor, and finalizer over
/// one store. Constructed once at startup and shared.
pub struct RosterService {
    epochs: EpochManager,
    reconciler: Reconciler,
    deltas: DeltaProcessor,
    finalizer: Finalizer,
    cache: Arc<DocRefCache>,
}

impl RosterService {
    /// Build the service over a store.
    pub fn new(store: Arc<dyn DocumentStore>, config: ReconcileConfig) -> Self {
        let cache = Arc::new(DocRefCache::new(config.cache_ttl, config.max_cache_bytes));
        let circuit = Arc::new(CircuitBreaker::new(
            config.error_threshold,
            config.circuit_reset,
        ));
        let finalizer = Finalizer::new(store.clone(), config.finalize_page_size);
        let reconciler = Reconciler::new(store.clone(), cache.clone(), circuit, config);
        Self {
            epochs: EpochManager::new(OrgRepository::new(store.clone())),
            reconciler,
            deltas: DeltaProcessor::new(store),
            finalizer,
            cache,
        }
    }

    /// Allocate the next epoch for an organization.
    pub async fn begin_run(&self, org: &OrgId, name: Option<&str>) -> ReconcileResult<i64> {
        self.epochs.begin_run(org, name).await
    }

    /// Finalize an epoch: sweep absentees, pin the organization's state.
    pub async fn finalize_run(&self, org: &OrgId, epoch: i64) -> ReconcileResult<usize> {
        Ok(self.finalizer.finalize(org, epoch).await?.marked_absent)
    }

    /// Ingest a snapshot batch: begin a new epoch, reconcile the rows under
    /// it, and finalize when `close_after` is set.
    #[instrument(skip(self, messages), fields(org = %org, rows = messages.len()))]
    pub async fn ingest_upserts(
        &self,
        org: &OrgId,
        org_name: Option<&str>,
        messages: &[UpsertMessage],
        channel: IngestChannel,
        close_after: bool,
    ) -> ReconcileResult<UpsertReport> {
        let started = Instant::now();
        let epoch = self.epochs.begin_run(org, org_name).await?;
        let outcome = self
            .reconciler
            .process_upserts(org, messages, epoch, channel)
            .await?;
        let finalized = if close_after {
            self.finalizer.finalize(org, epoch).await?;
            true
        } else {
            false
        };
        Ok(UpsertReport {
            processed: outcome.processed,
            skipped: outcome.skipped,
            errors: outcome.errors,
            epoch,
            finalized,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Apply delta transitions in order.
    pub async fn ingest_deltas(
        &self,
        org: &OrgId,
        messages: &[DeltaMessage],
        channel: IngestChannel,
    ) -> ReconcileResult<DeltaOutcome> {
        self.deltas.process(org, messages, channel).await
    }

    /// The underlying reconciler (adaptive state, circuit, metrics).
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Flush summaries and drop cached state. Called on graceful shutdown.
    pub fn shutdown(&self) {
        self.reconciler.metrics().log_summary();
        self.cache.log_summary();
        self.cache.invalidate_all();
    }
}
