//! Relay worker: the queue-to-store half of the pipeline

mod http;
mod worker;

pub use http::{build_worker_router, WorkerState};
pub use worker::{Iteration, RelayOptions, RelayWorker};
