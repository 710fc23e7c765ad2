//! Producer HTTP surface tests

mod common;

use common::{FlakyQueue, QueueFailure, RecordingStore};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use order_relay::producer::{build_router, AppState};
use order_relay::queue::{InMemoryQueue, MessageQueue};
use order_relay::relay::{build_worker_router, WorkerState};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_router() -> (axum::Router, Arc<FlakyQueue<InMemoryQueue>>) {
    let queue = FlakyQueue::new(InMemoryQueue::new("orders", Duration::from_secs(30)));
    let router = build_router(AppState::new(queue.clone()));
    (router, queue)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_summary_reports_zero_messages() {
    let (router, _queue) = test_router();

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Queue 'orders' has 0 messages");
}

#[tokio::test]
async fn test_enqueue_then_summary_is_singular() {
    let (router, _queue) = test_router();

    let response = router
        .clone()
        .oneshot(post_json("/", r#"{"message": "order-42"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["id"].is_string());
    assert!(body["enqueued_at"].is_string());

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "Queue 'orders' has 1 message");
}

#[tokio::test]
async fn test_count_endpoint_tracks_enqueues() {
    let (router, queue) = test_router();

    for i in 0..3 {
        let response = router
            .clone()
            .oneshot(post_json("/", &format!(r#"{{"message": "order-{}"}}"#, i)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["pending"], 3);
    drop(queue);
}

#[tokio::test]
async fn test_enqueue_during_outage_returns_503_with_retry_hint() {
    let (router, queue) = test_router();
    queue.set_failure(Some(QueueFailure::Unavailable));

    let response = router
        .oneshot(post_json("/", r#"{"message": "order-1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers().get(header::RETRY_AFTER).unwrap(),
        "10"
    );

    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "BACKEND_UNAVAILABLE");
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let (router, _queue) = test_router();

    let response = router
        .oneshot(post_json("/", r#"{"message": ""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _queue) = test_router();

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_text_format() {
    let (router, _queue) = test_router();

    // Touch a metric so the registry is non-empty
    order_relay::metrics::init_metrics();
    order_relay::metrics::RELAY_METRICS
        .messages_enqueued
        .with_label_values(&["orders"])
        .inc();

    let response = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response)
        .await
        .contains("relay_messages_enqueued_total"));
}

// Event-driven worker surface

fn worker_router() -> (axum::Router, Arc<RecordingStore>) {
    let queue = Arc::new(InMemoryQueue::new("orders", Duration::from_secs(30)));
    let store = RecordingStore::new();
    let router = build_worker_router(WorkerState {
        queue,
        store: store.clone(),
    });
    (router, store)
}

#[tokio::test]
async fn test_pushed_message_is_forwarded() {
    let (router, store) = worker_router();

    let response = router
        .oneshot(post_json(
            "/message",
            r#"{"id": "evt-1", "message": "order-42"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "relayed");

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "evt-1");
    assert_eq!(items[0].message, "order-42");
}

#[tokio::test]
async fn test_pushed_message_store_failure_maps_to_bad_gateway() {
    let (router, store) = worker_router();
    store.fail_with(500);

    let response = router
        .oneshot(post_json("/message", r#"{"message": "order-1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn test_worker_count_endpoint() {
    let queue = Arc::new(InMemoryQueue::new("orders", Duration::from_secs(30)));
    let store = RecordingStore::new();
    let router = build_worker_router(WorkerState {
        queue: queue.clone(),
        store,
    });

    queue.enqueue("order-1").await.unwrap();

    let response = router
        .oneshot(Request::builder().uri("/count").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["pending"], 1);
}
