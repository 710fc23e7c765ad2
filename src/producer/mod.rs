//! Producer: the HTTP ingress half of the pipeline

pub mod handlers;
pub mod routes;

pub use routes::build_router;

use crate::queue::MessageQueue;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state.
///
/// The queue client is constructed once at process start and injected
/// here; handlers never re-derive it from the environment.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn MessageQueue>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self {
            queue,
            started_at: Instant::now(),
        }
    }
}
