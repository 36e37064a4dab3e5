//! Admin surface: a second HTTP server, bound separately from the
//! data plane, exposing metrics and operational introspection.
//!
//! # Responsibilities
//! - `GET /metrics`  Prometheus text exposition
//! - `GET /healthz`  liveness: 200 while the process is up
//! - `GET /readyz`   readiness: 200 iff at least one route has at
//!   least one alive backend, else 503
//! - `GET /backends` JSON snapshot of every route's backends
//!
//! # Design Decisions
//! - Runs as its own Axum `Router` on `AdminConfig::bind_address`,
//!   started alongside the data-plane listener in `http::server`
//! - No authentication: the admin surface is expected to sit behind
//!   network-level access control, matching the out-of-scope wire
//!   shape for these endpoints

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::schema::AdminConfig;
use crate::dispatch::Gateway;
use self::handlers::AdminState;

pub async fn serve(
    config: AdminConfig,
    gateway: Arc<Gateway>,
    metrics_handle: PrometheusHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AdminState { gateway, metrics_handle };
    let app = Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/backends", get(handlers::backends))
        .with_state(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %config.bind_address, "admin server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("admin server initiating graceful shutdown");
        })
        .await?;

    Ok(())
}
