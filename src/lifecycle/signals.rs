//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate either into a single graceful-shutdown broadcast
//!
//! # Design Decisions
//! - Uses Tokio's async signal handling, not a blocking handler
//! - SIGTERM and Ctrl-C are equivalent: both start the same
//!   30s-bounded drain (`lifecycle::shutdown`)

use tokio::sync::broadcast;

/// Wait for SIGTERM or Ctrl-C, then broadcast a single shutdown
/// signal. Returns once the signal has been sent; callers that hold a
/// receiver already subscribed will observe it immediately.
pub async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    #[cfg(unix)]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received Ctrl-C, shutting down");
    }

    let _ = shutdown_tx.send(());
}
