//! Queue/topic abstraction for the relay pipeline.
//!
//! A durable, at-least-once delivery channel offering enqueue,
//! receive-with-lease, delete, and approximate-count operations. Two
//! backends satisfy the same contract:
//!
//! - **Memory**: in-process, for standalone demo mode and tests
//! - **Redis**: durable, for multi-instance deployments
//!
//! The lease mechanism is the sole concurrency-control point: while a
//! lease is active the message is visible to at most one receiver, and a
//! crashed consumer's messages reappear after lease expiry. This is
//! at-least-once, not exactly-once, delivery.

mod error;
mod factory;
mod memory;
mod message;
mod redis;
mod traits;

pub use error::{QueueError, QueueResult};
pub use factory::create_queue;
pub use memory::InMemoryQueue;
pub use message::{LeaseToken, Message, ReceivedMessage};
pub use redis::RedisQueue;
pub use traits::MessageQueue;
