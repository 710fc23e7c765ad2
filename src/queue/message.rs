//! Message types for the queue abstraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as it lives on the queue.
///
/// The id is generated at enqueue time, never supplied by the caller;
/// `enqueued_at` is stamped by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique message id
    pub id: Uuid,

    /// Opaque payload
    pub body: String,

    /// Set by the queue backend when the message was accepted
    pub enqueued_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with a fresh id
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
            enqueued_at: Utc::now(),
        }
    }
}

/// Time-bounded exclusive claim on a received message.
///
/// Required to delete the message; invalidated by lease expiry or a
/// successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaseToken(String);

impl LeaseToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LeaseToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl std::fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message handed to a single receiver under an active lease
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// The queued message
    pub message: Message,

    /// Lease required to acknowledge (delete) this delivery
    pub lease: LeaseToken,

    /// 1 on first delivery, incremented on each redelivery
    pub delivery_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_get_unique_ids() {
        let a = Message::new("order-1");
        let b = Message::new("order-1");
        assert_ne!(a.id, b.id);
        assert_eq!(a.body, b.body);
    }

    #[test]
    fn test_message_round_trips_through_json() {
        let message = Message::new("order-42");
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
    }

    #[test]
    fn test_lease_tokens_are_unique() {
        assert_ne!(LeaseToken::generate(), LeaseToken::generate());
    }
}
