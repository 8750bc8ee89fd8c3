//! Size/time-bounded batching of upsert rows.
//!
//! Rows accumulate per `(org, event)` key. A batch flushes when its row
//! count reaches the size bound, when the periodic sweep finds it older
//! than the age bound, or unconditionally on shutdown. Delivery failures
//! are absorbed here, logged and dropped after the forwarder's retry
//! budget, so consumption always progresses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use rostra_core::{EventId, OrgId};

use crate::config::BridgeConfig;
use crate::events::{UpsertRow, ValidatedUpsert};
use crate::forwarder::HttpForwarder;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BatchKey {
    org: OrgId,
    event: EventId,
}

struct PendingBatch {
    rows: Vec<UpsertRow>,
    created_at: Instant,
}

/// Accumulates upsert rows and flushes them through the HTTP forwarder.
pub struct UpsertBatcher {
    config: BridgeConfig,
    forwarder: Arc<HttpForwarder>,
    batches: Mutex<HashMap<BatchKey, PendingBatch>>,
}

impl UpsertBatcher {
    /// Create a batcher delivering through the given forwarder.
    pub fn new(config: BridgeConfig, forwarder: Arc<HttpForwarder>) -> Self {
        Self {
            config,
            forwarder,
            batches: Mutex::new(HashMap::new()),
        }
    }

    /// Add a validated event's rows to its batch, flushing by size if the
    /// row bound is reached. Events with no rows are skipped.
    pub async fn add(&self, event: ValidatedUpsert) {
        if event.rows.is_empty() {
            debug!(org = %event.org, event_id = %event.event, "skipping empty rows array");
            return;
        }

        let key = BatchKey {
            org: event.org,
            event: event.event,
        };

        let full = {
            let mut batches = self.batches.lock().await;
            let batch = batches.entry(key.clone()).or_insert_with(|| PendingBatch {
                rows: Vec::new(),
                created_at: Instant::now(),
            });
            batch.rows.extend(event.rows);
            if batch.rows.len() >= self.config.batch_max_rows {
                batches.remove(&key)
            } else {
                None
            }
        };

        if let Some(batch) = full {
            self.flush(key, batch).await;
        }
    }

    /// Flush every batch whose age reached the bound. Called by the sweeper.
    pub async fn sweep(&self) {
        let due: Vec<(BatchKey, PendingBatch)> = {
            let mut batches = self.batches.lock().await;
            let keys: Vec<BatchKey> = batches
                .iter()
                .filter(|(_, batch)| batch.created_at.elapsed() >= self.config.batch_max_age)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| batches.remove(&key).map(|batch| (key, batch)))
                .collect()
        };

        for (key, batch) in due {
            self.flush(key, batch).await;
        }
    }

    /// Flush everything regardless of age. Called on shutdown.
    pub async fn flush_all(&self) {
        let all: Vec<(BatchKey, PendingBatch)> =
            self.batches.lock().await.drain().collect();
        if !all.is_empty() {
            info!(batches = all.len(), "flushing remaining batches");
        }
        for (key, batch) in all {
            self.flush(key, batch).await;
        }
    }

    /// Number of batches currently pending.
    pub async fn pending(&self) -> usize {
        self.batches.lock().await.len()
    }

    async fn flush(&self, key: BatchKey, batch: PendingBatch) {
        let rows = batch.rows.len();
        match self
            .forwarder
            .post_upserts(&key.org, &key.event, &batch.rows)
            .await
        {
            Ok(outcome) => {
                debug!(org = %key.org, event_id = %key.event, rows, ?outcome, "batch delivered");
            }
            Err(e) => {
                // Dead-lettering is the operator's concern; the bridge only
                // guarantees the consumer keeps moving.
                error!(
                    org = %key.org,
                    event_id = %key.event,
                    rows,
                    error = %e,
                    "batch dropped after delivery failure"
                );
            }
        }
    }

    /// Spawn the periodic age sweep. The task exits when `shutdown` fires;
    /// the caller is expected to `flush_all` afterwards.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let batcher = self.clone();
        let mut interval = tokio::time::interval(batcher.config.batch_max_age);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => batcher.sweep().await,
                    _ = shutdown.changed() => {
                        debug!("sweep task stopping");
                        break;
                    }
                }
            }
        })
    }
}
