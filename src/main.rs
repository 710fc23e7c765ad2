use order_relay::{
    config::Config,
    error::Result,
    metrics,
    producer::{build_router, AppState},
    queue::create_queue,
    relay::{build_worker_router, RelayOptions, RelayWorker, WorkerState},
    store::{HttpStoreClient, StoreClient},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; missing required settings must prevent startup
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    tracing::info!("Starting order-relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(role = ?config.deployment.role, queue = %config.queue.name, "Deployment role");

    if config.observability.prometheus_enabled {
        metrics::init_metrics();
    }

    // The queue client is built once and shared; components receive it by
    // reference instead of re-deriving it from the environment
    let queue = create_queue(&config.queue)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize queue backend: {}", e))?;

    let cancel = CancellationToken::new();
    let role = config.deployment.role;

    // Ingress API
    let mut http_handle: JoinHandle<()> = idle_task(&cancel);
    if role.runs_ingress() {
        let app = build_router(AppState::new(queue.clone()));
        let addr = format!("{}:{}", config.server.host, config.server.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Ingress API listening on http://{}", addr);

        let shutdown = cancel.clone();
        http_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    // Relay worker (and its optional event-driven surface)
    let mut worker_handle: JoinHandle<Result<()>> = idle_ok_task(&cancel);
    let mut push_handle: JoinHandle<()> = idle_task(&cancel);
    if role.runs_worker() {
        let base_url = config
            .store
            .base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("worker role requires store.base_url"))?;
        let store: Arc<dyn StoreClient> = Arc::new(
            HttpStoreClient::new(
                base_url,
                Duration::from_secs(config.store.request_timeout_secs),
            )
            .map_err(|e| anyhow::anyhow!("Failed to build store client: {}", e))?,
        );

        if config.relay.http_enabled {
            let app = build_worker_router(WorkerState {
                queue: queue.clone(),
                store: store.clone(),
            });
            let addr = format!("{}:{}", config.server.host, config.relay.http_port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Worker surface listening on http://{}", addr);

            let shutdown = cancel.clone();
            push_handle = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown.cancelled_owned())
                    .await
                {
                    tracing::error!("Worker surface error: {}", e);
                }
            });
        }

        let worker = RelayWorker::new(queue, store, RelayOptions::from(&config.relay));
        let worker_cancel = cancel.clone();
        worker_handle = tokio::spawn(async move { worker.run(worker_cancel).await });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            cancel.cancel();
            // Drain: the worker observes the token within one iteration,
            // the servers finish their graceful shutdown
            if let Err(e) = flatten(worker_handle.await) {
                tracing::error!("Relay worker error during shutdown: {}", e);
            }
            let _ = http_handle.await;
            let _ = push_handle.await;
        }
        result = &mut worker_handle => {
            cancel.cancel();
            // An unrecoverable worker error terminates the process; the
            // supervisor is expected to restart it
            flatten(result)?;
            tracing::warn!("Relay worker stopped");
        }
        _ = &mut http_handle => {
            cancel.cancel();
            tracing::warn!("HTTP server stopped");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "order_relay={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Placeholder task for components this role does not run; resolves on
/// cancellation so shutdown never hangs on it
fn idle_task(cancel: &CancellationToken) -> JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move { cancel.cancelled().await })
}

fn idle_ok_task(cancel: &CancellationToken) -> JoinHandle<Result<()>> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        cancel.cancelled().await;
        Ok(())
    })
}

fn flatten(result: std::result::Result<Result<()>, JoinError>) -> anyhow::Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(anyhow::anyhow!(e)),
        Err(e) => Err(anyhow::anyhow!("relay worker task failed: {}", e)),
    }
}
