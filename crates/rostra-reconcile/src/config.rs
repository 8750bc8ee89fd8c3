//! Reconciler configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Tuning knobs for the reconciler, circuit breaker, and lookup cache.
///
/// Defaults match the store's economics: batches at the 500-op commit limit,
/// `in` queries at the 10-operand limit, five store calls in flight.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Initial (and maximum) write batch size. Default: 500.
    pub batch_size: usize,
    /// Emails per `in` lookup query. Default: 10.
    pub query_chunk_size: usize,
    /// Store calls in flight per invocation. Default: 5.
    pub max_parallel_batches: usize,
    /// Lookup cache entry TTL. Default: 300s.
    pub cache_ttl: Duration,
    /// Lookup cache byte budget. Default: 100 MiB.
    pub max_cache_bytes: u64,
    /// Cumulative error rate that opens the circuit. Default: 0.3.
    pub error_threshold: f64,
    /// How long the circuit stays open before a half-open probe. Default: 60s.
    pub circuit_reset: Duration,
    /// Invocation error rate above which the batch size shrinks. Default: 0.8.
    pub adaptive_batch_threshold: f64,
    /// Finalizer sweep page size. Default: 1000.
    pub finalize_page_size: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            query_chunk_size: 10,
            max_parallel_batches: 5,
            cache_ttl: Duration::from_millis(300_000),
            max_cache_bytes: 100 * 1024 * 1024,
            error_threshold: 0.3,
            circuit_reset: Duration::from_millis(60_000),
            adaptive_batch_threshold: 0.8,
            finalize_page_size: 1000,
        }
    }
}

impl ReconcileConfig {
    /// Load from environment variables, falling back to defaults for unset
    /// or unparsable values.
    ///
    /// Variables: `STORE_BATCH_SIZE`, `QUERY_CHUNK_SIZE`,
    /// `MAX_PARALLEL_BATCHES`, `CACHE_TTL_MS`, `MAX_CACHE_SIZE_MB`,
    /// `ERROR_THRESHOLD`, `CIRCUIT_RESET_MS`, `ADAPTIVE_BATCH_THRESHOLD`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parse("STORE_BATCH_SIZE", defaults.batch_size).clamp(1, 500),
            query_chunk_size: env_parse("QUERY_CHUNK_SIZE", defaults.query_chunk_size)
                .clamp(1, 10),
            max_parallel_batches: env_parse("MAX_PARALLEL_BATCHES", defaults.max_parallel_batches)
                .max(1),
            cache_ttl: Duration::from_millis(env_parse(
                "CACHE_TTL_MS",
                defaults.cache_ttl.as_millis() as u64,
            )),
            max_cache_bytes: env_parse("MAX_CACHE_SIZE_MB", 100u64) * 1024 * 1024,
            error_threshold: env_parse("ERROR_THRESHOLD", defaults.error_threshold),
            circuit_reset: Duration::from_millis(env_parse(
                "CIRCUIT_RESET_MS",
                defaults.circuit_reset.as_millis() as u64,
            )),
            adaptive_batch_threshold: env_parse(
                "ADAPTIVE_BATCH_THRESHOLD",
                defaults.adaptive_batch_threshold,
            ),
            finalize_page_size: env_parse("FINALIZE_PAGE_SIZE", defaults.finalize_page_size)
                .max(1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
