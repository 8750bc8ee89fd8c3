//! Reconciler counters.
//!
//! Plain atomics rather than a metrics registry: the counters feed the
//! adaptive logic and the shutdown summary log, nothing scrapes them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters for one reconciler instance.
#[derive(Debug, Default)]
pub struct ReconcilerMetrics {
    pub invocations: AtomicU64,
    pub rows_in: AtomicU64,
    pub rows_written: AtomicU64,
    pub rows_skipped: AtomicU64,
    pub write_errors: AtomicU64,
}

impl ReconcilerMetrics {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Log a summary; called on graceful shutdown.
    pub fn log_summary(&self) {
        tracing::info!(
            invocations = self.invocations.load(Ordering::Relaxed),
            rows_in = self.rows_in.load(Ordering::Relaxed),
            rows_written = self.rows_written.load(Ordering::Relaxed),
            rows_skipped = self.rows_skipped.load(Ordering::Relaxed),
            write_errors = self.write_errors.load(Ordering::Relaxed),
            "reconciler summary"
        );
    }
}
