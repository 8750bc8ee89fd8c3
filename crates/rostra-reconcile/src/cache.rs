//! Lookup cache: organization-scoped email → employee document reference.
//!
//! Absorbs repeated resolution queries across ingestion bursts. Entries
//! expire after the configured TTL and the whole cache is bounded by a byte
//! budget enforced through moka's weigher; when the budget is exceeded the
//! least-valuable entries are evicted.

use moka::future::Cache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rostra_core::{EmployeeId, OrgId};

/// Byte-budgeted, TTL-expiring map of `(org, email)` → employee id.
pub struct DocRefCache {
    cache: Cache<(String, String), EmployeeId>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DocRefCache {
    /// Create a cache with the given TTL and byte budget.
    #[must_use]
    pub fn new(ttl: Duration, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_bytes)
            .weigher(|(org, email): &(String, String), _id: &EmployeeId| {
                // Key strings plus the 16-byte uuid payload.
                (org.len() + email.len() + 16) as u32
            })
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached document reference.
    pub async fn get(&self, org: &OrgId, email: &str) -> Option<EmployeeId> {
        let found = self
            .cache
            .get(&(org.as_str().to_string(), email.to_string()))
            .await;
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Populate after a successful lookup or create.
    pub async fn insert(&self, org: &OrgId, email: &str, id: EmployeeId) {
        self.cache
            .insert((org.as_str().to_string(), email.to_string()), id)
            .await;
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// `(hits, misses)` since construction.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Log a usage summary; called on graceful shutdown.
    pub fn log_summary(&self) {
        let (hits, misses) = self.stats();
        tracing::info!(
            hits,
            misses,
            entries = self.entry_count(),
            "lookup cache summary"
        );
    }
}
