//! Ingestion API tests over the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use rostra_api_ingest::{ingest_router, IngestState};
use rostra_reconcile::{ReconcileConfig, RosterService};
use rostra_store::MemoryStore;

const TOKEN: &str = "test-ingestion-token";

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(RosterService::new(
        store.clone(),
        ReconcileConfig::default(),
    ));
    (ingest_router(IngestState::new(service, TOKEN)), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-auth", TOKEN)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_open_and_shaped() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "rostra");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn ingest_requires_token() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/ingest/kafka/upserts")
        .header("content-type", "application/json")
        .body(Body::from(json!({"orgId": "acme"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_rejects_wrong_token() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/ingest/kafka/upserts")
        .header("content-type", "application/json")
        .header("x-auth", "wrong")
        .body(Body::from(json!({"orgId": "acme"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upsert_snapshot_roundtrip() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/ingest/kafka/upserts",
            json!({
                "orgId": "acme",
                "messages": [
                    {"email": "alice@x.com", "statusInOrg": "active"},
                    {"email": "bob@x.com", "statusInOrg": "active"},
                    {"email": "charlie@x.com", "statusInOrg": "terminated"}
                ],
                "closeAfter": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 3);
    assert_eq!(body["skipped"], 0);
    assert_eq!(body["errors"], 0);
    assert_eq!(body["epoch"], 1);
    assert_eq!(body["finalized"], true);
    assert!(body["durationMs"].is_number());
}

#[tokio::test]
async fn upsert_missing_org_is_bad_request() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/ingest/kafka/upserts",
            json!({"orgId": "  ", "messages": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_field");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn empty_messages_succeed_with_zero_processed() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/ingest/kafka/upserts",
            json!({"orgId": "acme"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn repeated_event_id_answers_conflict_without_new_documents() {
    let (app, store) = test_app();
    let payload = json!({
        "orgId": "acme",
        "messages": [
            {"email": "alice@x.com", "statusInOrg": "active"},
            {"email": "bob@x.com", "statusInOrg": "active"}
        ],
        "closeAfter": true
    });

    let response = app
        .clone()
        .oneshot(post_json(
            "/ingest/kafka/upserts?orgId=acme&eventId=evt-1",
            payload.clone(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let docs_after_first = store.len().await;

    let response = app
        .oneshot(post_json(
            "/ingest/kafka/upserts?orgId=acme&eventId=evt-1",
            payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "duplicate_event");

    assert_eq!(store.len().await, docs_after_first);
}

#[tokio::test]
async fn deltas_apply_over_snapshot() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/ingest/kafka/upserts",
            json!({
                "orgId": "acme",
                "messages": [{"email": "charlie@x.com", "statusInOrg": "terminated"}],
                "closeAfter": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/ingest/kafka/deltas",
            json!({
                "orgId": "acme",
                "messages": [
                    {"email": "charlie@x.com", "deltaType": "reactivated"},
                    {"email": "ghost@x.com", "deltaType": "left"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 1);
    assert_eq!(body["skipped"], 1);
}

#[tokio::test]
async fn email_json_rows_ingest_and_finalize() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/ingest/email",
            json!({
                "orgId": "acme",
                "orgName": "Acme Corp",
                "rows": [
                    {"email": "a@x.com", "statusInOrg": "active"},
                    {"email": "b@x.com", "statusInOrg": "on leave"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], 2);
    assert_eq!(body["kind"], "upserts");
}

#[tokio::test]
async fn email_multipart_csv_ingests() {
    let (app, _) = test_app();

    let boundary = "X-ROSTRA-TEST-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"orgId\"\r\n\r\n\
         acme\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"roster.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         email,statusInOrg\r\nalice@x.com,active\r\nbob@x.com,terminated\r\n\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/ingest/email")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header("x-auth", TOKEN)
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["processed"], 2);
    assert_eq!(body["kind"], "upserts");
}

#[tokio::test]
async fn email_multipart_without_file_is_bad_request() {
    let (app, _) = test_app();

    let boundary = "X-ROSTRA-TEST-BOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"orgId\"\r\n\r\n\
         acme\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/ingest/email")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header("x-auth", TOKEN)
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_delta_kind_applies_transitions() {
    let (app, _) = test_app();
    app.clone()
        .oneshot(post_json(
            "/ingest/email",
            json!({
                "orgId": "acme",
                "rows": [{"email": "a@x.com", "statusInOrg": "active"}]
            }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/ingest/email",
            json!({
                "orgId": "acme",
                "kind": "deltas",
                "rows": [{"email": "a@x.com", "deltaType": "inactive"}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["processed"], 1);
    assert_eq!(body["kind"], "deltas");
}
