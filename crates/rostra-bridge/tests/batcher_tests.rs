//! Batcher flush semantics: size-bounded, age-bounded, shutdown drain, and
//! per-(org, event) isolation.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rostra_bridge::{BridgeConfig, HttpForwarder, UpsertBatcher, UpsertEvent};

fn config(base_url: &str, batch_max_rows: usize, batch_max_age: Duration) -> BridgeConfig {
    BridgeConfig {
        normalizer_base_url: base_url.to_string(),
        ingestion_token: "secret-token".to_string(),
        http_timeout: Duration::from_secs(2),
        batch_max_rows,
        batch_max_age,
        retry_base: Duration::from_millis(5),
        retry_max: Duration::from_millis(20),
        max_retries: 1,
        concurrency: 1,
    }
}

fn batcher(config: BridgeConfig) -> Arc<UpsertBatcher> {
    let forwarder = Arc::new(HttpForwarder::new(&config).unwrap());
    Arc::new(UpsertBatcher::new(config, forwarder))
}

fn event(org: &str, event_id: &str, emails: &[&str]) -> rostra_bridge::ValidatedUpsert {
    let rows: Vec<serde_json::Value> = emails
        .iter()
        .map(|e| serde_json::json!({"email": e, "statusInOrg": "active"}))
        .collect();
    let payload = serde_json::json!({"orgId": org, "eventId": event_id, "rows": rows});
    UpsertEvent::parse(payload.to_string().as_bytes()).unwrap()
}

#[tokio::test]
async fn size_bound_flushes_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/kafka/upserts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Age bound far away so only the size bound can flush.
    let batcher = batcher(config(&server.uri(), 3, Duration::from_secs(600)));
    batcher.add(event("acme", "evt-1", &["a@x.com", "b@x.com"])).await;
    assert_eq!(batcher.pending().await, 1);
    batcher.add(event("acme", "evt-1", &["c@x.com"])).await;
    assert_eq!(batcher.pending().await, 0, "size flush must clear the batch");

    // A sweep right after must not flush it again.
    batcher.sweep().await;
    server.verify().await;
}

#[tokio::test]
async fn age_bound_flushes_via_sweep() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/kafka/upserts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let batcher = batcher(config(&server.uri(), 1000, Duration::from_millis(30)));
    batcher.add(event("acme", "evt-1", &["a@x.com"])).await;

    // Too young: the sweep leaves it alone.
    batcher.sweep().await;
    assert_eq!(batcher.pending().await, 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    batcher.sweep().await;
    assert_eq!(batcher.pending().await, 0);
    server.verify().await;
}

#[tokio::test]
async fn batches_keyed_by_org_and_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/kafka/upserts"))
        .and(query_param("eventId", "evt-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ingest/kafka/upserts"))
        .and(query_param("eventId", "evt-2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let batcher = batcher(config(&server.uri(), 1000, Duration::from_secs(600)));
    // Same org, two events: never combined.
    batcher.add(event("acme", "evt-1", &["a@x.com"])).await;
    batcher.add(event("acme", "evt-2", &["b@x.com"])).await;
    // Same event across two messages: merged into one batch.
    batcher.add(event("acme", "evt-1", &["c@x.com"])).await;
    assert_eq!(batcher.pending().await, 2);

    batcher.flush_all().await;
    assert_eq!(batcher.pending().await, 0);
    server.verify().await;
}

#[tokio::test]
async fn empty_rows_are_skipped() {
    let server = MockServer::start().await;
    let batcher = batcher(config(&server.uri(), 1000, Duration::from_secs(600)));
    batcher.add(event("acme", "evt-1", &[])).await;
    assert_eq!(batcher.pending().await, 0);
}

#[tokio::test]
async fn delivery_failure_is_absorbed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest/kafka/upserts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let batcher = batcher(config(&server.uri(), 1, Duration::from_secs(600)));
    // Size flush fires immediately and fails after retries; add must not
    // propagate the error and the batch map must be clear.
    batcher.add(event("acme", "evt-1", &["a@x.com"])).await;
    assert_eq!(batcher.pending().await, 0);
}
