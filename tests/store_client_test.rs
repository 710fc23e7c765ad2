//! HttpStoreClient against a mock store service

use order_relay::store::{HttpStoreClient, StoreClient, StoreError};
use std::time::Duration;

fn client_for(server: &mockito::ServerGuard) -> HttpStoreClient {
    HttpStoreClient::new(server.url(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_append_posts_item_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/store")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::Json(serde_json::json!({
            "id": "abc-123",
            "message": "order-42"
        })))
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    client.append("abc-123", "order-42").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_append_surfaces_server_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/store")
        .with_status(500)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.append("abc", "order-1").await.unwrap_err();

    assert!(matches!(err, StoreError::Status(500)));
}

#[tokio::test]
async fn test_duplicate_appends_are_accepted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/store")
        .with_status(200)
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    client.append("abc", "order-1").await.unwrap();
    client.append("abc", "order-1").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_count_parses_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/store/count")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"count": 7}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    assert_eq!(client.count().await.unwrap(), 7);
}

#[tokio::test]
async fn test_list_parses_items() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/store")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": "a", "message": "order-1"}, {"id": "b", "message": "order-2"}]"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let items = client.list().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "a");
    assert_eq!(items[1].message, "order-2");
}

#[tokio::test]
async fn test_unreachable_store_is_a_transport_error() {
    // Nothing listens on this port
    let client = HttpStoreClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let err = client.append("abc", "order-1").await.unwrap_err();

    assert!(matches!(err, StoreError::Unreachable(_)));
}

#[tokio::test]
async fn test_count_rejects_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/store/count")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.count().await.unwrap_err();

    assert!(matches!(err, StoreError::Response(_)));
}
