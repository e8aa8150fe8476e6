//! Metrics HTTP server
//!
//! Exposes the Prometheus text exposition at `/metrics` and a liveness probe
//! at `/health`.

use axum::routing::get;
use axum::Router;
use eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(observability::metrics_handler))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// Bind the listener up front so an unusable address fails startup.
pub async fn bind(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address)
        .await
        .wrap_err_with(|| format!("Failed to bind metrics server to {}", address))?;

    info!(address = %address, "Metrics server listening");
    Ok(listener)
}

/// Serve until `shutdown` flips to `true`.
pub async fn serve(listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .wrap_err("Metrics server failed")?;

    info!("Metrics server stopped");
    Ok(())
}
