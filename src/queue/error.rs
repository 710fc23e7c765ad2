//! Error types for queue operations

use crate::error::AppError;

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Errors that can occur during queue operations
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Backend connectivity failure; transient
    #[error("Queue backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Queue or topic not yet created; transient, longer backoff
    #[error("Queue not provisioned: {0}")]
    NotProvisioned(String),

    /// Lease expired or token does not match; the message may have been
    /// redelivered to another receiver
    #[error("Lease expired or invalid for message {0}")]
    LeaseExpired(uuid::Uuid),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::BackendUnavailable(msg) => AppError::BackendUnavailable(msg),
            QueueError::NotProvisioned(msg) => AppError::NotProvisioned(msg),
            QueueError::Serialization(msg) => AppError::Serialization(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
