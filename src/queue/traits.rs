//! Queue trait abstraction

use crate::queue::error::QueueResult;
use crate::queue::message::{LeaseToken, Message, ReceivedMessage};
use async_trait::async_trait;
use uuid::Uuid;

/// Durable, at-least-once delivery channel.
///
/// A received message is invisible to other receivers while its lease is
/// active; if it is not deleted before the lease expires it becomes
/// receivable again. No ordering is guaranteed.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a new message with a server-generated id.
    ///
    /// On success the backend durably holds the message.
    async fn enqueue(&self, body: &str) -> QueueResult<Message>;

    /// Receive one message under a lease.
    ///
    /// Returns `Ok(None)` when the queue is empty; that is the idle
    /// branch, not an error.
    async fn receive(&self) -> QueueResult<Option<ReceivedMessage>>;

    /// Delete a received message, committing the delivery.
    ///
    /// Fails with `LeaseExpired` if the lease is no longer valid.
    async fn delete(&self, id: Uuid, lease: &LeaseToken) -> QueueResult<()>;

    /// Best-effort approximate pending count; may be stale, never blocks
    /// on a full scan. Observability only.
    async fn approximate_len(&self) -> QueueResult<u64>;

    /// Queue name, for logs and metric labels
    fn name(&self) -> &str;
}
