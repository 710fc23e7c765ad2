//! Event-driven worker surface.
//!
//! When a pub/sub dispatcher pushes deliveries instead of the worker
//! pulling them, this router accepts one message per request and forwards
//! it to the store synchronously; the dispatcher's acknowledgement
//! semantics ride on the HTTP status code.

use crate::error::{AppError, Result};
use crate::queue::MessageQueue;
use crate::store::StoreClient;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

/// Shared state for the worker surface
#[derive(Clone)]
pub struct WorkerState {
    pub queue: Arc<dyn MessageQueue>,
    pub store: Arc<dyn StoreClient>,
}

/// Build the worker-side router (`POST /message`, `GET /count`)
pub fn build_worker_router(state: WorkerState) -> Router {
    Router::new()
        .route("/message", post(receive_pushed_message))
        .route("/count", get(pending_count))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Deserialize, Validate)]
pub struct PushedMessage {
    /// Dispatcher-assigned id; generated here when absent
    pub id: Option<String>,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PushAck {
    pub id: String,
    pub status: String,
}

/// Accept one pushed message and forward it to the store.
///
/// A non-success response tells the dispatcher to redeliver; the store
/// must tolerate the resulting duplicates.
async fn receive_pushed_message(
    State(state): State<WorkerState>,
    Json(request): Json<PushedMessage>,
) -> Result<Json<PushAck>> {
    request.validate()?;

    let id = request.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    state
        .store
        .append(&id, &request.message)
        .await
        .map_err(|e| {
            tracing::error!(message_id = %id, error = %e, "Failed to forward pushed message");
            AppError::ForwardFailure(e.to_string())
        })?;

    tracing::info!(message_id = %id, "Pushed message forwarded to store");

    Ok(Json(PushAck {
        id,
        status: "relayed".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct PendingCountResponse {
    pub pending: u64,
}

/// Approximate pending message count
async fn pending_count(State(state): State<WorkerState>) -> Result<Json<PendingCountResponse>> {
    let pending = state.queue.approximate_len().await?;
    Ok(Json(PendingCountResponse { pending }))
}
