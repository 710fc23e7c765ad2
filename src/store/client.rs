//! HTTP client for the external store service.
//!
//! The store is a black box to the relay: only the success/failure signal
//! of an append matters to the worker's state transition. The client
//! carries an explicit bounded timeout so a hung store cannot wedge the
//! worker loop.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur talking to the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport-level failure (connection refused, timeout, DNS)
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// Store answered with a non-success status
    #[error("Store returned status {0}")]
    Status(u16),

    /// Response body could not be decoded
    #[error("Store response error: {0}")]
    Response(String),
}

/// A record as listed back by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredItem {
    pub id: String,
    pub message: String,
}

/// Persistence endpoint consumed by the relay worker
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Append one item. Success means the item is persisted; the relay
    /// may acknowledge the source message.
    async fn append(&self, id: &str, message: &str) -> StoreResult<()>;

    /// Number of stored items
    async fn count(&self) -> StoreResult<u64>;

    /// List all stored items
    async fn list(&self) -> StoreResult<Vec<StoredItem>>;
}

/// Store client talking to the store's HTTP surface
/// (`POST /store`, `GET /store`, `GET /store/count`)
#[derive(Clone)]
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
}

impl HttpStoreClient {
    /// Build a client with a bounded request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn append(&self, id: &str, message: &str) -> StoreResult<()> {
        let response = self
            .client
            .post(self.url("/store"))
            .json(&StoredItem {
                id: id.to_string(),
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }

        Ok(())
    }

    async fn count(&self) -> StoreResult<u64> {
        let response = self
            .client
            .get(self.url("/store/count"))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }

        #[derive(Deserialize)]
        struct CountResponse {
            count: u64,
        }

        let body: CountResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))?;
        Ok(body.count)
    }

    async fn list(&self) -> StoreResult<Vec<StoredItem>> {
        let response = self
            .client
            .get(self.url("/store"))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = HttpStoreClient::new("http://localhost:3000/", Duration::from_secs(10)).unwrap();
        assert_eq!(client.url("/store"), "http://localhost:3000/store");
    }

    #[test]
    fn test_stored_item_wire_shape() {
        let item = StoredItem {
            id: "abc".to_string(),
            message: "order-42".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["message"], "order-42");
    }
}
