//! Reliable message-relay pipeline.
//!
//! A producer (HTTP ingress) enqueues opaque payloads onto a durable
//! queue abstraction; a long-lived relay worker receives each message
//! under a lease, forwards it to an external store over HTTP, and deletes
//! it only after the forward succeeds. Delivery is at-least-once: a
//! crashed worker causes redelivery after lease expiry, and the store is
//! expected to tolerate the resulting duplicates.
//!
//! ```text
//! client → producer → queue/topic → relay worker → store
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod producer;
pub mod queue;
pub mod relay;
pub mod store;
