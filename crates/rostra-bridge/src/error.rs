//! Bridge error types.

use thiserror::Error;

/// Error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Terminal HTTP status from the ingestion API (4xx other than 409/429).
    #[error("ingestion API rejected the request with status {status}")]
    Rejected { status: u16 },

    /// Network/timeout failure talking to the ingestion API.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The retry budget ran out; the batch is dropped with a structured log.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// A source message was structurally unusable and was skipped.
    #[error("invalid message: {reason}")]
    InvalidMessage { reason: String },

    /// Event-stream client failure.
    #[cfg(feature = "kafka")]
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

impl BridgeError {
    /// Convenience constructor for skipped messages.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            reason: reason.into(),
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
