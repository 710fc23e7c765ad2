//! Queue backend selection

use crate::config::{QueueBackend, QueueConfig};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::memory::InMemoryQueue;
use crate::queue::redis::RedisQueue;
use crate::queue::traits::MessageQueue;
use std::sync::Arc;
use std::time::Duration;

/// Create a queue backend based on configuration
pub async fn create_queue(config: &QueueConfig) -> QueueResult<Arc<dyn MessageQueue>> {
    let visibility_timeout = Duration::from_secs(config.visibility_timeout_secs);

    match config.backend {
        QueueBackend::Memory => {
            tracing::info!(queue = %config.name, "Initializing in-memory queue backend");
            Ok(Arc::new(InMemoryQueue::new(
                config.name.clone(),
                visibility_timeout,
            )))
        }

        QueueBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                QueueError::BackendUnavailable(
                    "Redis backend requires 'redis_url' configuration".to_string(),
                )
            })?;

            tracing::info!(queue = %config.name, "Initializing Redis queue backend");

            let queue = RedisQueue::new(
                redis_url,
                config.name.clone(),
                config.key_prefix.clone(),
                visibility_timeout,
            )
            .await?;
            Ok(Arc::new(queue))
        }
    }
}
