//! In-process queue backend.
//!
//! Lease semantics match the durable backends (receive hides a message
//! until its lease expires or it is deleted) but nothing survives a
//! process restart. Used by standalone demo mode and tests.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::{LeaseToken, Message, ReceivedMessage};
use crate::queue::traits::MessageQueue;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct QueuedEntry {
    message: Message,
    delivery_count: u32,
}

struct LeasedEntry {
    message: Message,
    delivery_count: u32,
    lease: LeaseToken,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    ready: VecDeque<QueuedEntry>,
    leased: HashMap<Uuid, LeasedEntry>,
}

/// In-memory queue with real lease bookkeeping
pub struct InMemoryQueue {
    name: String,
    visibility_timeout: Duration,
    inner: Mutex<Inner>,
}

impl InMemoryQueue {
    pub fn new(name: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            visibility_timeout,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Move expired leases back to the ready queue. Reclaim placement is
    /// an implementation detail; the contract guarantees no ordering.
    fn reclaim_expired(inner: &mut Inner, now: Instant) {
        let expired: Vec<Uuid> = inner
            .leased
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            if let Some(entry) = inner.leased.remove(&id) {
                tracing::debug!(message_id = %id, "Lease expired, message requeued");
                inner.ready.push_front(QueuedEntry {
                    message: entry.message,
                    delivery_count: entry.delivery_count,
                });
            }
        }
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn enqueue(&self, body: &str) -> QueueResult<Message> {
        let message = Message::new(body);
        let mut inner = self.inner.lock();
        inner.ready.push_back(QueuedEntry {
            message: message.clone(),
            delivery_count: 0,
        });
        Ok(message)
    }

    async fn receive(&self) -> QueueResult<Option<ReceivedMessage>> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::reclaim_expired(&mut inner, now);

        let Some(entry) = inner.ready.pop_front() else {
            return Ok(None);
        };

        let lease = LeaseToken::generate();
        let delivery_count = entry.delivery_count + 1;
        let received = ReceivedMessage {
            message: entry.message.clone(),
            lease: lease.clone(),
            delivery_count,
        };

        inner.leased.insert(
            entry.message.id,
            LeasedEntry {
                message: entry.message,
                delivery_count,
                lease,
                expires_at: now + self.visibility_timeout,
            },
        );

        Ok(Some(received))
    }

    async fn delete(&self, id: Uuid, lease: &LeaseToken) -> QueueResult<()> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        Self::reclaim_expired(&mut inner, now);

        match inner.leased.get(&id) {
            Some(entry) if &entry.lease == lease => {
                inner.leased.remove(&id);
                Ok(())
            }
            _ => Err(QueueError::LeaseExpired(id)),
        }
    }

    async fn approximate_len(&self) -> QueueResult<u64> {
        let inner = self.inner.lock();
        Ok((inner.ready.len() + inner.leased.len()) as u64)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
