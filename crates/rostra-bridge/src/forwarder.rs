//! HTTP delivery to the ingestion API with idempotent retry.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use rostra_core::{EventId, OrgId};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{DeltaEvent, UpsertRow};

/// Exponential backoff with jitter: `min(base * 2^attempt, max) ± 20%`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base
            .as_millis()
            .saturating_mul(1u128 << attempt.min(32))
            .min(self.max.as_millis()) as f64;
        let jitter = rand::thread_rng().gen_range(-0.2..=0.2);
        Duration::from_millis((exp * (1.0 + jitter)).max(0.0) as u64)
    }
}

/// How a batch ended up on the other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Accepted and processed.
    Delivered,
    /// HTTP 409: the receiving side had already applied this event.
    Duplicate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertBody<'a> {
    org_id: &'a str,
    messages: &'a [UpsertRow],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeltaBody<'a> {
    org_id: &'a str,
    messages: &'a [DeltaEvent],
}

/// Keep-alive HTTP client for the ingestion API.
pub struct HttpForwarder {
    client: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl HttpForwarder {
    /// Build a forwarder from the bridge configuration.
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.normalizer_base_url.trim_end_matches('/').to_string(),
            token: config.ingestion_token.clone(),
            retry: RetryPolicy {
                base: config.retry_base,
                max: config.retry_max,
                max_retries: config.max_retries,
            },
        })
    }

    /// Deliver one upsert batch for a single `(org, event)` pair.
    pub async fn post_upserts(
        &self,
        org: &OrgId,
        event: &EventId,
        rows: &[UpsertRow],
    ) -> BridgeResult<ForwardOutcome> {
        let url = format!("{}/ingest/kafka/upserts", self.base_url);
        let body = serde_json::to_value(UpsertBody {
            org_id: org.as_str(),
            messages: rows,
        })
        .map_err(|e| BridgeError::invalid(format!("unserializable batch: {e}")))?;
        self.send_with_retry(&url, &[("orgId", org.as_str()), ("eventId", event.as_str())], body)
            .await
    }

    /// Deliver delta messages for one organization.
    pub async fn post_deltas(
        &self,
        org: &OrgId,
        deltas: &[DeltaEvent],
    ) -> BridgeResult<ForwardOutcome> {
        let url = format!("{}/ingest/kafka/deltas", self.base_url);
        let body = serde_json::to_value(DeltaBody {
            org_id: org.as_str(),
            messages: deltas,
        })
        .map_err(|e| BridgeError::invalid(format!("unserializable deltas: {e}")))?;
        self.send_with_retry(&url, &[("orgId", org.as_str())], body).await
    }

    /// POST with the bridge retry policy: 5xx/429/transport retried, 409
    /// treated as success, other 4xx terminal.
    async fn send_with_retry(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: serde_json::Value,
    ) -> BridgeResult<ForwardOutcome> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .client
                .post(url)
                .query(query)
                .header("X-Auth", &self.token)
                .json(&body)
                .send()
                .await;

            let last_error = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(ForwardOutcome::Delivered);
                    }
                    if status == StatusCode::CONFLICT {
                        debug!(url, "duplicate event acknowledged with 409");
                        return Ok(ForwardOutcome::Duplicate);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        format!("status {status}")
                    } else {
                        return Err(BridgeError::Rejected {
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) => e.to_string(),
            };

            attempt += 1;
            if attempt > self.retry.max_retries {
                return Err(BridgeError::RetriesExhausted {
                    attempts: attempt,
                    last: last_error,
                });
            }
            let delay = self.retry.delay(attempt - 1);
            warn!(
                url,
                attempt,
                max_retries = self.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "retrying delivery after transient failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_is_exponential_within_jitter() {
        let policy = RetryPolicy {
            base: Duration::from_millis(500),
            max: Duration::from_millis(15_000),
            max_retries: 8,
        };
        for (attempt, nominal) in [(0u32, 500u64), (1, 1000), (2, 2000), (3, 4000)] {
            let delay = policy.delay(attempt).as_millis() as u64;
            let low = nominal * 8 / 10;
            let high = nominal * 12 / 10;
            assert!(
                (low..=high).contains(&delay),
                "attempt {attempt}: {delay} outside [{low}, {high}]"
            );
        }
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = RetryPolicy {
            base: Duration::from_millis(500),
            max: Duration::from_millis(15_000),
            max_retries: 8,
        };
        // 500 * 2^10 would be far past the cap.
        let delay = policy.delay(10).as_millis() as u64;
        assert!(delay <= 18_000, "{delay} over cap with jitter");
        assert!(delay >= 12_000, "{delay} under cap with jitter");
    }
}
