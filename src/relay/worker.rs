//! Relay worker: receives messages under a lease, forwards them to the
//! store, and acknowledges only after a confirmed successful forward.
//!
//! The loop is an explicit state machine. Each call to [`RelayWorker::run_once`]
//! performs one `Receiving → Forwarding → Acknowledging` pass and reports a
//! named [`Iteration`] outcome; [`RelayWorker::run`] drives it until the
//! cancellation token fires, applying the per-outcome backoff.
//!
//! Invariant: a message is deleted if and only if the store append for it
//! returned success at least once. Deletion is not atomic with forwarding,
//! so a crash between the two yields a duplicate append after redelivery —
//! the store, not the relay, is the dedup point.

use crate::config::RelaySettings;
use crate::error::{AppError, Result};
use crate::metrics::RELAY_METRICS;
use crate::queue::{MessageQueue, QueueError};
use crate::store::StoreClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one pass through the relay state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Message forwarded and acknowledged
    Relayed { id: Uuid, delivery_count: u32 },
    /// Queue empty; idle branch, not an error
    Idle,
    /// Transient receive failure; message (if any) stays queued
    ReceiveFailed,
    /// Queue/topic does not exist yet; wait longer and retry
    NotProvisioned,
    /// Store append failed; message left leased for redelivery
    ForwardFailed { id: Uuid },
    /// Forward succeeded but the delete did not commit; redelivery will
    /// produce a duplicate append downstream
    AckFailed { id: Uuid },
}

/// Backoff intervals for the worker loop
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Sleep when the queue is empty
    pub idle_backoff: Duration,
    /// Sleep when the queue is not yet provisioned
    pub provision_backoff: Duration,
    /// Sleep after a transient receive failure
    pub receive_backoff: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_secs(5),
            provision_backoff: Duration::from_secs(10),
            receive_backoff: Duration::from_secs(1),
        }
    }
}

impl From<&RelaySettings> for RelayOptions {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            idle_backoff: Duration::from_secs(settings.idle_backoff_secs),
            provision_backoff: Duration::from_secs(settings.provision_backoff_secs),
            receive_backoff: Duration::from_secs(settings.receive_backoff_secs),
        }
    }
}

/// Long-lived queue-to-store relay
pub struct RelayWorker {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn StoreClient>,
    options: RelayOptions,
}

impl RelayWorker {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn StoreClient>,
        options: RelayOptions,
    ) -> Self {
        Self {
            queue,
            store,
            options,
        }
    }

    /// One pass: receive, forward, acknowledge.
    ///
    /// Transient failures are absorbed into outcomes; an `Err` here is
    /// unrecoverable and terminates the worker.
    pub async fn run_once(&self) -> Result<Iteration> {
        let queue_name = self.queue.name().to_string();

        let received = match self.queue.receive().await {
            Ok(Some(received)) => received,
            Ok(None) => return Ok(Iteration::Idle),
            Err(QueueError::NotProvisioned(msg)) => {
                tracing::info!(queue = %queue_name, reason = %msg, "Queue does not exist yet, waiting");
                return Ok(Iteration::NotProvisioned);
            }
            Err(QueueError::BackendUnavailable(msg)) => {
                tracing::error!(queue = %queue_name, error = %msg, "Failed to receive from queue");
                RELAY_METRICS
                    .receive_failures
                    .with_label_values(&[&queue_name, "backend_unavailable"])
                    .inc();
                return Ok(Iteration::ReceiveFailed);
            }
            Err(err) => {
                // Corrupted records and the like: no useful degraded mode
                return Err(AppError::Internal(format!(
                    "unrecoverable receive error: {}",
                    err
                )));
            }
        };

        let id = received.message.id;
        tracing::info!(
            message_id = %id,
            delivery_count = received.delivery_count,
            queue = %queue_name,
            "Received message"
        );

        // Forward before delete; the message must survive a failed append
        let forward_start = Instant::now();
        if let Err(err) = self
            .store
            .append(&id.to_string(), &received.message.body)
            .await
        {
            tracing::error!(message_id = %id, error = %err, "Failed to forward message to store");
            RELAY_METRICS
                .forward_failures
                .with_label_values(&[&queue_name, "store_error"])
                .inc();
            return Ok(Iteration::ForwardFailed { id });
        }
        RELAY_METRICS
            .forward_latency
            .with_label_values(&[&queue_name])
            .observe(forward_start.elapsed().as_secs_f64());

        // Commit the relay
        match self.queue.delete(id, &received.lease).await {
            Ok(()) => {
                tracing::info!(message_id = %id, queue = %queue_name, "Message relayed and acknowledged");
                RELAY_METRICS
                    .messages_relayed
                    .with_label_values(&[&queue_name])
                    .inc();
                Ok(Iteration::Relayed {
                    id,
                    delivery_count: received.delivery_count,
                })
            }
            Err(QueueError::LeaseExpired(_)) => {
                tracing::warn!(
                    message_id = %id,
                    "Lease expired before acknowledge; the store may receive a duplicate"
                );
                Ok(Iteration::AckFailed { id })
            }
            Err(QueueError::BackendUnavailable(msg)) => {
                tracing::error!(message_id = %id, error = %msg, "Failed to acknowledge message");
                Ok(Iteration::AckFailed { id })
            }
            Err(err) => Err(AppError::Internal(format!(
                "unrecoverable acknowledge error: {}",
                err
            ))),
        }
    }

    /// Backoff to apply after an iteration, if any
    fn backoff_for(&self, outcome: &Iteration) -> Option<Duration> {
        match outcome {
            Iteration::Idle => Some(self.options.idle_backoff),
            Iteration::NotProvisioned => Some(self.options.provision_backoff),
            Iteration::ReceiveFailed => Some(self.options.receive_backoff),
            // Forward/ack failures rely on lease-expiry redelivery; the
            // loop moves straight on to the next message
            Iteration::Relayed { .. }
            | Iteration::ForwardFailed { .. }
            | Iteration::AckFailed { .. } => None,
        }
    }

    /// Drive the loop until cancellation. Cancellation is observed at each
    /// iteration boundary, so shutdown completes within one in-flight
    /// iteration and an in-flight forward is allowed to finish.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let queue_name = self.queue.name().to_string();
        tracing::info!(queue = %queue_name, "Relay worker started, waiting for messages");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = match self.run_once().await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(error = %err, "Unrecoverable error in relay worker");
                    return Err(err);
                }
            };

            if let Ok(depth) = self.queue.approximate_len().await {
                RELAY_METRICS
                    .pending_depth
                    .with_label_values(&[&queue_name])
                    .set(depth as f64);
            }

            if let Some(backoff) = self.backoff_for(&outcome) {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }

        tracing::info!(queue = %queue_name, "Relay worker shutting down");
        Ok(())
    }
}
