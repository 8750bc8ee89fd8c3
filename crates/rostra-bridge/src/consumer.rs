//! Kafka consumer feeding the batcher and the delta forwarder.
//!
//! One consumer subscribes to both topics and dispatches by topic name.
//! Upserts go through the batcher; deltas bypass it and are forwarded
//! one at a time so per-key ordering survives. Malformed messages are
//! logged and skipped; the consumer never fails a message back to the
//! broker, so consumption always progresses.

use std::sync::Arc;

use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::batcher::UpsertBatcher;
use crate::config::KafkaSourceConfig;
use crate::error::BridgeResult;
use crate::events::{DeltaEvent, UpsertEvent};
use crate::forwarder::HttpForwarder;

/// The bridge's event-stream consumer.
pub struct BridgeConsumer {
    consumer: StreamConsumer,
    batcher: Arc<UpsertBatcher>,
    forwarder: Arc<HttpForwarder>,
    topic_upserts: String,
    topic_deltas: String,
}

impl BridgeConsumer {
    /// Connect and subscribe to the upsert and delta topics.
    pub fn new(
        kafka: &KafkaSourceConfig,
        batcher: Arc<UpsertBatcher>,
        forwarder: Arc<HttpForwarder>,
    ) -> BridgeResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &kafka.brokers)
            .set("client.id", &kafka.client_id)
            .set("group.id", &kafka.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[kafka.topic_upserts.as_str(), kafka.topic_deltas.as_str()])?;

        info!(
            brokers = %kafka.brokers,
            group_id = %kafka.group_id,
            topic_upserts = %kafka.topic_upserts,
            topic_deltas = %kafka.topic_deltas,
            "bridge consumer subscribed"
        );

        Ok(Self {
            consumer,
            batcher,
            forwarder,
            topic_upserts: kafka.topic_upserts.clone(),
            topic_deltas: kafka.topic_deltas.clone(),
        })
    }

    /// Consume until shutdown fires, then flush the remaining batches.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("bridge consumer stopping");
                    break;
                }
                received = self.consumer.recv() => match received {
                    Ok(message) => {
                        let payload = message.payload().unwrap_or_default();
                        self.dispatch(message.topic(), payload).await;
                        if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                            warn!(error = %e, "offset commit failed");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "consumer receive error");
                    }
                }
            }
        }

        // Drain what the sweeper has not flushed yet through the normal
        // delivery path.
        self.batcher.flush_all().await;
    }

    async fn dispatch(&self, topic: &str, payload: &[u8]) {
        if topic == self.topic_upserts {
            match UpsertEvent::parse(payload) {
                Ok(event) => self.batcher.add(event).await,
                Err(e) => warn!(topic, error = %e, "skipping malformed upsert message"),
            }
        } else if topic == self.topic_deltas {
            match DeltaEvent::parse(payload) {
                Ok((org, delta)) => {
                    if let Err(e) = self.forwarder.post_deltas(&org, &[delta]).await {
                        error!(org = %org, error = %e, "delta delivery failed, dropping");
                    }
                }
                Err(e) => warn!(topic, error = %e, "skipping malformed delta message"),
            }
        } else {
            warn!(topic, "message from unexpected topic");
        }
    }
}
