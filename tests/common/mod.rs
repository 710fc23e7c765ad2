//! Shared test doubles for the relay pipeline

use async_trait::async_trait;
use order_relay::queue::{LeaseToken, Message, MessageQueue, QueueError, QueueResult, ReceivedMessage};
use order_relay::store::{StoreClient, StoreError, StoreResult, StoredItem};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory store that records appends and can be forced to fail,
/// standing in for the external store service
pub struct RecordingStore {
    items: Mutex<Vec<StoredItem>>,
    fail_with_status: Mutex<Option<u16>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(Vec::new()),
            fail_with_status: Mutex::new(None),
        })
    }

    /// Make every append fail with the given HTTP status
    pub fn fail_with(&self, status: u16) {
        *self.fail_with_status.lock() = Some(status);
    }

    /// Let appends succeed again
    pub fn recover(&self) {
        *self.fail_with_status.lock() = None;
    }

    pub fn items(&self) -> Vec<StoredItem> {
        self.items.lock().clone()
    }
}

#[async_trait]
impl StoreClient for RecordingStore {
    async fn append(&self, id: &str, message: &str) -> StoreResult<()> {
        if let Some(status) = *self.fail_with_status.lock() {
            return Err(StoreError::Status(status));
        }
        self.items.lock().push(StoredItem {
            id: id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.items.lock().len() as u64)
    }

    async fn list(&self) -> StoreResult<Vec<StoredItem>> {
        Ok(self.items())
    }
}

/// Queue wrapper that can simulate backend outages and a queue that has
/// not been provisioned yet
pub struct FlakyQueue<Q> {
    inner: Q,
    failure: Mutex<Option<QueueFailure>>,
}

#[derive(Clone, Copy)]
pub enum QueueFailure {
    Unavailable,
    NotProvisioned,
}

impl<Q> FlakyQueue<Q> {
    pub fn new(inner: Q) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failure: Mutex::new(None),
        })
    }

    pub fn set_failure(&self, failure: Option<QueueFailure>) {
        *self.failure.lock() = failure;
    }

    fn check(&self) -> QueueResult<()> {
        match *self.failure.lock() {
            Some(QueueFailure::Unavailable) => Err(QueueError::BackendUnavailable(
                "connection refused".to_string(),
            )),
            Some(QueueFailure::NotProvisioned) => {
                Err(QueueError::NotProvisioned("queue does not exist".to_string()))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<Q: MessageQueue> MessageQueue for FlakyQueue<Q> {
    async fn enqueue(&self, body: &str) -> QueueResult<Message> {
        self.check()?;
        self.inner.enqueue(body).await
    }

    async fn receive(&self) -> QueueResult<Option<ReceivedMessage>> {
        self.check()?;
        self.inner.receive().await
    }

    async fn delete(&self, id: Uuid, lease: &LeaseToken) -> QueueResult<()> {
        self.check()?;
        self.inner.delete(id, lease).await
    }

    async fn approximate_len(&self) -> QueueResult<u64> {
        self.check()?;
        self.inner.approximate_len().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
