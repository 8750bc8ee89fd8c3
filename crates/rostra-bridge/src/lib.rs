//! # rostra-bridge
//!
//! Consumes per-partition roster events and delivers them to the ingestion
//! API as size/time-bounded HTTP batches with idempotent retry.
//!
//! Upsert rows are grouped strictly by `(org, event)`: a flushed batch
//! belongs to exactly one source event so the receiving side can apply
//! event-level idempotency. Deltas bypass batching and are forwarded
//! one-by-one to preserve per-key ordering.

pub mod batcher;
pub mod config;
#[cfg(feature = "kafka")]
pub mod consumer;
pub mod error;
pub mod events;
pub mod forwarder;

pub use batcher::UpsertBatcher;
pub use config::{BridgeConfig, ConfigError, KafkaSourceConfig};
#[cfg(feature = "kafka")]
pub use consumer::BridgeConsumer;
pub use error::{BridgeError, BridgeResult};
pub use events::{DeltaEvent, UpsertEvent, UpsertRow, ValidatedUpsert};
pub use forwarder::{ForwardOutcome, HttpForwarder, RetryPolicy};
