use crate::error::Result;
use crate::metrics::RELAY_METRICS;
use crate::producer::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Plaintext pending-count summary, the shape the dashboard polls
pub async fn queue_summary(State(state): State<AppState>) -> Result<String> {
    let count = state.queue.approximate_len().await?;
    let plural = if count == 1 { "" } else { "s" };
    Ok(format!(
        "Queue '{}' has {} message{}",
        state.queue.name(),
        count,
        plural
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct EnqueueRequest {
    /// Opaque payload; only presence is validated
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
}

/// Enqueue one message with a server-generated id.
///
/// Does not wait for consumer processing: success means the backend
/// durably holds the message. Backend trouble surfaces as 503 with a
/// `Retry-After` hint via the error conversion.
pub async fn enqueue_message(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>> {
    request.validate()?;

    let queue_name = state.queue.name().to_string();

    let message = match state.queue.enqueue(&request.message).await {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(queue = %queue_name, error = %err, "Something went wrong connecting to the queue");
            RELAY_METRICS
                .enqueue_failures
                .with_label_values(&[&queue_name, "backend_error"])
                .inc();
            return Err(err.into());
        }
    };

    tracing::info!(message_id = %message.id, queue = %queue_name, "Message enqueued");
    RELAY_METRICS
        .messages_enqueued
        .with_label_values(&[&queue_name])
        .inc();

    Ok(Json(EnqueueResponse {
        id: message.id,
        enqueued_at: message.enqueued_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingCountResponse {
    pub pending: u64,
}

/// JSON pending count for the dashboard polling contract
pub async fn pending_count(State(state): State<AppState>) -> Result<Json<PendingCountResponse>> {
    let pending = state.queue.approximate_len().await?;
    RELAY_METRICS
        .pending_depth
        .with_label_values(&[state.queue.name()])
        .set(pending as f64);
    Ok(Json(PendingCountResponse { pending }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    (StatusCode::OK, crate::metrics::gather_metrics())
}
