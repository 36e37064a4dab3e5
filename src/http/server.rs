//! HTTP server setup and request entry point.
//!
//! # Responsibilities
//! - Bind the serving port and accept connections (TLS optional)
//! - Delegate every request to `dispatch::Gateway`
//! - Apply the configured request body size limit before the request
//!   reaches the dispatcher
//! - Watch for config updates and reload the gateway's route table
//!   without dropping in-flight requests
//! - Drain in-flight requests on shutdown, bounded to 30 s (§5)
//!
//! # Design Decisions
//! - One `hyper_util` legacy client, shared across all routes and
//!   backends, for connection pooling
//! - The admin surface is a second Axum server on its own bind
//!   address, started alongside the data-plane listener
//! - `max_connections` is enforced as a global concurrency limit on
//!   the data-plane router (`tower::limit::GlobalConcurrencyLimitLayer`)
//!   rather than a custom pre-accept semaphore: both `axum::serve` and
//!   `axum_server`'s TLS path own their accept loops directly, so a
//!   request-layer admission limit composes with either without a
//!   bespoke `Accept` wrapper

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use axum::{body::Body, extract::DefaultBodyLimit};
use axum_server::Handle;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::catch_panic::CatchPanicLayer;

use crate::admin;
use crate::config::ProxyConfig;
use crate::dispatch::Gateway;
use crate::lifecycle::shutdown::DRAIN_TIMEOUT;
use crate::net::tls::load_tls_config;
use crate::security::limits::body_limit_layer;

/// Application state shared by every data-plane request handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

/// HTTP server for the reverse proxy's data plane.
pub struct HttpServer {
    config: ProxyConfig,
    gateway: Arc<Gateway>,
}

impl HttpServer {
    pub fn new(config: ProxyConfig) -> Self {
        let gateway = Gateway::new(&config);
        Self { config, gateway }
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    /// Run the data-plane listener and the admin listener, reloading
    /// the route table whenever `config_updates` produces a new,
    /// already-validated configuration.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: watch::Receiver<Option<ProxyConfig>>,
        mut shutdown: broadcast::Receiver<()>,
        metrics_handle: PrometheusHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.gateway.clone().start_health_checkers().await;

        let admin_config = self.config.admin.clone();
        if admin_config.enabled {
            let admin_gateway = self.gateway.clone();
            let admin_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                if let Err(e) = admin::serve(admin_config, admin_gateway, metrics_handle, admin_shutdown).await {
                    tracing::error!(error = %e, "admin server exited with error");
                }
            });
        }

        let reload_gateway = self.gateway.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = config_updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let Some(new_config) = config_updates.borrow_and_update().clone() else {
                            continue;
                        };
                        tracing::info!("applying new configuration");
                        reload_gateway.reload(&new_config).await;
                    }
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app_state = AppState { gateway: self.gateway.clone() };
        let app = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(DefaultBodyLimit::disable())
            .layer(body_limit_layer(&self.config.security))
            .layer(GlobalConcurrencyLimitLayer::new(self.config.listener.max_connections))
            .layer(CatchPanicLayer::new())
            .with_state(app_state)
            .into_make_service_with_connect_info::<SocketAddr>();

        if let Some(tls_config) = self.config.listener.tls.clone() {
            tracing::info!("TLS enabled, loading certificates");
            let cert_path = std::path::Path::new(&tls_config.cert_path);
            let key_path = std::path::Path::new(&tls_config.key_path);
            let rustls_config = load_tls_config(cert_path, key_path).await?;

            let handle = Handle::new();
            let mut https_shutdown = shutdown.resubscribe();
            let h = handle.clone();
            tokio::spawn(async move {
                let _ = https_shutdown.recv().await;
                tracing::info!("HTTPS server initiating graceful shutdown");
                h.graceful_shutdown(Some(DRAIN_TIMEOUT));
            });

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .handle(handle)
                .serve(app)
                .await?;
        } else {
            let (drain_tx, drain_rx) = tokio::sync::oneshot::channel();
            let serve = tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        tracing::info!("HTTP server initiating graceful shutdown");
                        let _ = drain_tx.send(());
                    })
                    .await
            });
            let _ = drain_rx.await;
            match tokio::time::timeout(DRAIN_TIMEOUT, serve).await {
                Ok(joined) => joined??,
                Err(_) => tracing::warn!("drain timeout elapsed with connections still open"),
            }
        }

        self.gateway.stop_health_checkers();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> impl IntoResponse {
    state.gateway.dispatch(request, peer).await
}
