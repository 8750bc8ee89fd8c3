//! Event-level idempotency for snapshot batches.
//!
//! The bridge retries whole batches, each belonging to exactly one
//! `(org, event)` pair. A batch that was already applied answers 409, which
//! the bridge treats as success. Entries expire, so the ledger bounds memory
//! while covering the bridge's retry horizon.

use std::time::Duration;

use moka::sync::Cache;

/// How long a processed event id is remembered.
const LEDGER_TTL: Duration = Duration::from_secs(10 * 60);

/// How many processed event ids are retained at most.
const LEDGER_CAPACITY: u64 = 100_000;

/// TTL-bounded set of processed `(org, event)` pairs.
pub struct EventLedger {
    seen: Cache<(String, String), ()>,
}

impl EventLedger {
    /// Create a ledger with the default TTL and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Cache::builder()
                .time_to_live(LEDGER_TTL)
                .max_capacity(LEDGER_CAPACITY)
                .build(),
        }
    }

    /// Whether this `(org, event)` pair was already processed.
    #[must_use]
    pub fn seen(&self, org: &str, event: &str) -> bool {
        self.seen
            .contains_key(&(org.to_string(), event.to_string()))
    }

    /// Record a successfully processed `(org, event)` pair.
    pub fn record(&self, org: &str, event: &str) {
        self.seen.insert((org.to_string(), event.to_string()), ());
    }
}

impl Default for EventLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_seen() {
        let ledger = EventLedger::new();
        assert!(!ledger.seen("acme", "evt-1"));
        ledger.record("acme", "evt-1");
        assert!(ledger.seen("acme", "evt-1"));
        assert!(!ledger.seen("acme", "evt-2"));
        assert!(!ledger.seen("globex", "evt-1"));
    }
}
