//! The reconciler/optimizer.
//!
//! Converges the store to a list of upsert messages for one organization and
//! one epoch using O(N/K) lookup queries and O(N/B) batched writes:
//!
//! 1. deduplicate input in reverse, keeping the last occurrence per email
//! 2. resolve existing documents through the lookup cache, with misses
//!    fetched by chunked `in` queries run in bounded-parallel waves
//! 3. prepare one write per surviving row (set-merge for existing documents,
//!    create with a fresh id for new ones)
//! 4. commit the writes in groups of the current batch size, again in
//!    bounded-parallel waves; group commits fail independently
//! 5. adapt the batch size to the observed error rate after every wave
//!
//! Every group commit also feeds the shared circuit breaker, which refuses
//! whole invocations while the store looks overloaded.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use rostra_core::{EmployeeId, IngestChannel, IngestKind, OrgId, SourceTag};
use rostra_store::models::{employee_path, EmployeeUpsert};
use rostra_store::repo::EmployeeRepository;
use rostra_store::{DocumentStore, WriteBatch};

use crate::cache::DocRefCache;
use crate::circuit::CircuitBreaker;
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::metrics::ReconcilerMetrics;
use crate::types::{NormalizedUpsert, UpsertMessage};

/// Adaptive batch size never shrinks below this.
const MIN_ADAPTIVE_BATCH: usize = 100;

/// Per-invocation counts returned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Rows written to the store.
    pub processed: usize,
    /// Rows dropped before writing: invalid emails and collapsed duplicates.
    pub skipped: usize,
    /// Rows lost to failed lookups or failed group commits.
    pub errors: usize,
}

/// One prepared write, carrying enough context to repopulate the cache after
/// its group commits.
struct PreparedWrite {
    email: String,
    id: EmployeeId,
    fields: rostra_store::FieldMap,
    is_new: bool,
}

/// The reconciler. One instance is shared by all invocations so the adaptive
/// batch size, the cache, and the circuit state persist across them.
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
    employees: EmployeeRepository,
    cache: Arc<DocRefCache>,
    circuit: Arc<CircuitBreaker>,
    config: ReconcileConfig,
    batch_size: AtomicUsize,
    metrics: ReconcilerMetrics,
}

impl Reconciler {
    /// Create a reconciler over a store.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<DocRefCache>,
        circuit: Arc<CircuitBreaker>,
        config: ReconcileConfig,
    ) -> Self {
        let batch_size = AtomicUsize::new(config.batch_size);
        Self {
            employees: EmployeeRepository::new(store.clone()),
            store,
            cache,
            circuit,
            config,
            batch_size,
            metrics: ReconcilerMetrics::new(),
        }
    }

    /// The circuit breaker shared with other components.
    #[must_use]
    pub fn circuit(&self) -> &Arc<CircuitBreaker> {
        &self.circuit
    }

    /// Current adaptive batch size.
    #[must_use]
    pub fn current_batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    /// Cumulative counters.
    #[must_use]
    pub fn metrics(&self) -> &ReconcilerMetrics {
        &self.metrics
    }

    /// Converge the store to the given upsert messages under `epoch`.
    ///
    /// Refuses outright with [`ReconcileError::CircuitOpen`] while the
    /// circuit is open; per-row problems are counted, never fatal.
    #[instrument(skip(self, messages), fields(org = %org, epoch, rows = messages.len()))]
    pub async fn process_upserts(
        &self,
        org: &OrgId,
        messages: &[UpsertMessage],
        epoch: i64,
        channel: IngestChannel,
    ) -> ReconcileResult<ReconcileOutcome> {
        if !self.circuit.allows().await {
            return Err(ReconcileError::CircuitOpen {
                retry_after_ms: self.circuit.retry_after_ms().await,
            });
        }

        self.metrics.add(&self.metrics.invocations, 1);
        self.metrics.add(&self.metrics.rows_in, messages.len());

        let mut outcome = ReconcileOutcome::default();

        // Normalize and validate; invalid rows are skipped, not fatal.
        let mut normalized: Vec<NormalizedUpsert> = Vec::with_capacity(messages.len());
        for message in messages {
            match message.normalize() {
                Some(row) => normalized.push(row),
                None => {
                    debug!(email = %message.email, "skipping row with invalid email");
                    outcome.skipped += 1;
                }
            }
        }

        // Reverse-walk dedup keeps the last occurrence per email, which
        // preserves last-write-wins while collapsing repeats.
        let mut seen: HashSet<&str> = HashSet::with_capacity(normalized.len());
        let mut keep = vec![false; normalized.len()];
        for (idx, row) in normalized.iter().enumerate().rev() {
            if seen.insert(row.email.as_str()) {
                keep[idx] = true;
            }
        }
        let deduped: Vec<NormalizedUpsert> = normalized
            .iter()
            .zip(&keep)
            .filter_map(|(row, kept)| kept.then(|| row.clone()))
            .collect();
        outcome.skipped += normalized.len() - deduped.len();

        if deduped.is_empty() {
            self.metrics.add(&self.metrics.rows_skipped, outcome.skipped);
            return Ok(outcome);
        }

        // Resolve existing documents: cache first, then chunked `in` queries
        // in waves of at most `max_parallel_batches`.
        let mut resolved: HashMap<String, EmployeeId> = HashMap::new();
        let mut misses: Vec<String> = Vec::new();
        for row in &deduped {
            match self.cache.get(org, &row.email).await {
                Some(id) => {
                    resolved.insert(row.email.clone(), id);
                }
                None => misses.push(row.email.clone()),
            }
        }

        let mut failed_lookups: HashSet<String> = HashSet::new();
        let chunks: Vec<&[String]> = misses.chunks(self.config.query_chunk_size).collect();
        for wave in chunks.chunks(self.config.max_parallel_batches) {
            let results = join_all(
                wave.iter()
                    .map(|chunk| self.employees.find_by_emails(org, chunk)),
            )
            .await;
            for (chunk, result) in wave.iter().zip(results) {
                match result {
                    Ok(docs) => {
                        self.circuit.record_success().await;
                        for doc in docs {
                            self.cache.insert(org, &doc.email, doc.id).await;
                            resolved.insert(doc.email, doc.id);
                        }
                    }
                    Err(e) => {
                        self.circuit.record_failure().await;
                        warn!(error = %e, emails = chunk.len(), "lookup chunk failed");
                        failed_lookups.extend(chunk.iter().cloned());
                    }
                }
            }
        }

        // Prepare one write per row. Rows whose lookup failed are dropped as
        // errors rather than risked as duplicate creates.
        let source = SourceTag::new(channel, IngestKind::Upsert);
        let mut prepared: Vec<PreparedWrite> = Vec::with_capacity(deduped.len());
        for row in deduped {
            if failed_lookups.contains(&row.email) {
                outcome.errors += 1;
                continue;
            }
            let upsert = EmployeeUpsert {
                email: row.email.clone(),
                status_in_org: row.status,
                last_seen_epoch: epoch,
                source,
                last_event_id: row.event_id,
            };
            let (id, is_new) = match resolved.get(&row.email) {
                Some(id) => (*id, false),
                None => (EmployeeId::new(), true),
            };
            prepared.push(PreparedWrite {
                email: row.email,
                id,
                fields: upsert.to_fields(),
                is_new,
            });
        }

        // Commit in groups of the current batch size, waves of
        // `max_parallel_batches`. Group failures are independent.
        let group_size = self.current_batch_size().max(1);
        let groups: Vec<&[PreparedWrite]> = prepared.chunks(group_size).collect();
        for wave in groups.chunks(self.config.max_parallel_batches) {
            let results = join_all(wave.iter().map(|group| self.commit_group(org, group))).await;
            for (group, result) in wave.iter().zip(results) {
                match result {
                    Ok(()) => {
                        self.circuit.record_success().await;
                        outcome.processed += group.len();
                        for write in *group {
                            self.cache.insert(org, &write.email, write.id).await;
                        }
                    }
                    Err(e) => {
                        self.circuit.record_failure().await;
                        outcome.errors += group.len();
                        warn!(error = %e, rows = group.len(), "group commit failed");
                    }
                }
            }
            self.adapt_batch_size(outcome.processed, outcome.errors);
        }

        self.metrics.add(&self.metrics.rows_written, outcome.processed);
        self.metrics.add(&self.metrics.rows_skipped, outcome.skipped);
        self.metrics.add(&self.metrics.write_errors, outcome.errors);

        Ok(outcome)
    }

    async fn commit_group(
        &self,
        org: &OrgId,
        group: &[PreparedWrite],
    ) -> rostra_store::StoreResult<()> {
        let mut batch = WriteBatch::new();
        for write in group {
            // New documents are full creates; existing ones merge so fields
            // outside this write survive.
            batch.set(
                employee_path(org, &write.id),
                write.fields.clone(),
                !write.is_new,
            );
        }
        self.store.commit(batch).await
    }

    /// Shrink under sustained failure, grow back carefully when healthy.
    fn adapt_batch_size(&self, processed: usize, errors: usize) {
        let attempted = processed + errors;
        if attempted == 0 {
            return;
        }
        let rate = errors as f64 / attempted as f64;
        let current = self.batch_size.load(Ordering::Relaxed);

        let next = if rate > self.config.adaptive_batch_threshold {
            ((current as f64 * 0.7) as usize).max(MIN_ADAPTIVE_BATCH)
        } else if rate < 0.05 && current < self.config.batch_size {
            ((current as f64 * 1.2) as usize).min(self.config.batch_size)
        } else {
            current
        };

        if next != current {
            debug!(error_rate = rate, from = current, to = next, "adapting batch size");
            self.batch_size.store(next, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostra_store::MemoryStore;

    fn reconciler_with(config: ReconcileConfig) -> Reconciler {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(DocRefCache::new(config.cache_ttl, config.max_cache_bytes));
        let circuit = Arc::new(CircuitBreaker::new(
            config.error_threshold,
            config.circuit_reset,
        ));
        Reconciler::new(store, cache, circuit, config)
    }

    fn msg(email: &str, status: Option<&str>) -> UpsertMessage {
        UpsertMessage {
            email: email.to_string(),
            status_in_org: status.map(ToString::to_string),
            event_id: None,
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_a_noop() {
        let reconciler = reconciler_with(ReconcileConfig::default());
        let org = OrgId::new("acme").unwrap();
        let outcome = reconciler
            .process_upserts(&org, &[], 1, IngestChannel::Kafka)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::default());
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let reconciler = reconciler_with(ReconcileConfig::default());
        let org = OrgId::new("acme").unwrap();
        let outcome = reconciler
            .process_upserts(
                &org,
                &[msg("not-an-email", None), msg("ok@x.com", None)],
                1,
                IngestChannel::Kafka,
            )
            .await
            .unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.errors, 0);
    }

    #[tokio::test]
    async fn test_duplicates_collapse_to_last_occurrence() {
        let reconciler = reconciler_with(ReconcileConfig::default());
        let org = OrgId::new("acme").unwrap();
        let outcome = reconciler
            .process_upserts(
                &org,
                &[msg("bob@x.com", Some("active")), msg("bob@x.com", Some("inactive"))],
                1,
                IngestChannel::Kafka,
            )
            .await
            .unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.skipped, 1);

        let employees = EmployeeRepository::new(reconciler.store.clone());
        let bob = employees
            .find_by_email(&org, "bob@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.status_in_org, rostra_core::EmployeeStatus::Inactive);
    }

    #[tokio::test]
    async fn test_repeated_upsert_updates_in_place() {
        let reconciler = reconciler_with(ReconcileConfig::default());
        let org = OrgId::new("acme").unwrap();

        for epoch in 1..=2 {
            reconciler
                .process_upserts(
                    &org,
                    &[msg("a@x.com", Some("active"))],
                    epoch,
                    IngestChannel::Kafka,
                )
                .await
                .unwrap();
        }

        let employees = EmployeeRepository::new(reconciler.store.clone());
        let found = employees.find_by_emails(&org, &["a@x.com".to_string()]).await.unwrap();
        assert_eq!(found.len(), 1, "second upsert must not create a second doc");
        assert_eq!(found[0].last_seen_epoch, 2);
    }

    #[tokio::test]
    async fn test_batch_size_floor_and_cap() {
        let reconciler = reconciler_with(ReconcileConfig::default());
        // Hammer the shrink path: stays at the 100 floor.
        for _ in 0..30 {
            reconciler.adapt_batch_size(0, 10);
        }
        assert_eq!(reconciler.current_batch_size(), MIN_ADAPTIVE_BATCH);

        // Healthy traffic grows it back, capped at the configured maximum.
        for _ in 0..30 {
            reconciler.adapt_batch_size(100, 0);
        }
        assert_eq!(reconciler.current_batch_size(), 500);
    }
}
