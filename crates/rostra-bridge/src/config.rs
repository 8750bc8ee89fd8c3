//! Bridge configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Delivery and batching configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the ingestion API (e.g. "http://localhost:8080").
    pub normalizer_base_url: String,
    /// Shared token sent as `X-Auth`.
    pub ingestion_token: String,
    /// Per-request HTTP timeout. Default: 10s.
    pub http_timeout: Duration,
    /// Rows that force a size flush. Default: 1000.
    pub batch_max_rows: usize,
    /// Age that forces a time flush; also the sweep interval. Default: 1.2s.
    pub batch_max_age: Duration,
    /// First retry backoff. Default: 500ms.
    pub retry_base: Duration,
    /// Backoff ceiling. Default: 15s.
    pub retry_max: Duration,
    /// Retry attempts before a batch is dropped. Default: 8.
    pub max_retries: u32,
    /// Per-partition consumer concurrency. Default: 1.
    pub concurrency: usize,
}

impl BridgeConfig {
    /// Load from environment variables.
    ///
    /// Required: `NORMALIZER_BASE_URL`, `INGESTION_TOKEN`. Everything else
    /// falls back to defaults: `HTTP_TIMEOUT_MS=10000`,
    /// `BATCH_MAX_ROWS=1000`, `BATCH_MAX_MS=1200`, `RETRY_BASE_MS=500`,
    /// `RETRY_MAX_MS=15000`, `MAX_RETRIES=8`, `CONCURRENCY=1`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let normalizer_base_url = env::var("NORMALIZER_BASE_URL")
            .map_err(|_| ConfigError::MissingVar("NORMALIZER_BASE_URL".to_string()))?;
        let ingestion_token = env::var("INGESTION_TOKEN")
            .map_err(|_| ConfigError::MissingVar("INGESTION_TOKEN".to_string()))?;

        if !normalizer_base_url.starts_with("http://")
            && !normalizer_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                var: "NORMALIZER_BASE_URL".to_string(),
                message: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self {
            normalizer_base_url,
            ingestion_token,
            http_timeout: Duration::from_millis(env_parse("HTTP_TIMEOUT_MS", 10_000)),
            batch_max_rows: env_parse("BATCH_MAX_ROWS", 1000usize).max(1),
            batch_max_age: Duration::from_millis(env_parse("BATCH_MAX_MS", 1200)),
            retry_base: Duration::from_millis(env_parse("RETRY_BASE_MS", 500)),
            retry_max: Duration::from_millis(env_parse("RETRY_MAX_MS", 15_000)),
            max_retries: env_parse("MAX_RETRIES", 8u32),
            concurrency: env_parse("CONCURRENCY", 1usize).max(1),
        })
    }
}

/// Event-stream connection settings.
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    pub brokers: String,
    pub client_id: String,
    pub group_id: String,
    pub topic_upserts: String,
    pub topic_deltas: String,
}

impl KafkaSourceConfig {
    /// Load from environment variables. `KAFKA_BROKERS` is required; the
    /// rest default to the service's conventional names.
    pub fn from_env() -> Result<Self, ConfigError> {
        let brokers = env::var("KAFKA_BROKERS")
            .map_err(|_| ConfigError::MissingVar("KAFKA_BROKERS".to_string()))?;
        Ok(Self {
            brokers,
            client_id: env::var("KAFKA_CLIENT_ID")
                .unwrap_or_else(|_| "rostra-bridge".to_string()),
            group_id: env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "rostra-bridge".to_string()),
            topic_upserts: env::var("TOPIC_UPSERTS")
                .unwrap_or_else(|_| "roster.upserts".to_string()),
            topic_deltas: env::var("TOPIC_DELTAS").unwrap_or_else(|_| "roster.deltas".to_string()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
