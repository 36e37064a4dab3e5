//! Rust Production Reverse Proxy (v1)

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use crate::config::loader::load_config;
use crate::config::watcher::ConfigWatcher;
use crate::http::HttpServer;
use crate::lifecycle::{shutdown, signals, startup};

/// Reverse proxy data plane.
#[derive(Parser)]
#[command(name = "reverse-proxy")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Parse and validate the configuration, then exit without serving.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_path();

    if cli.check_config {
        return match load_config(config_path) {
            Ok(_) => {
                println!("{} is valid", config_path.display());
                Ok(())
            }
            Err(e) => {
                eprintln!("{} is invalid: {e}", config_path.display());
                std::process::exit(1);
            }
        };
    }

    let config = match startup::load_or_init(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load initial configuration: {e}");
            std::process::exit(1);
        }
    };

    observability::logging::init(&config.logging);
    tracing::info!("reverse-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        "configuration loaded"
    );

    let metrics_handle = observability::metrics::install();

    let (watcher_instance, config_updates) = ConfigWatcher::new(config_path);
    let _watcher = watcher_instance.run()?;

    let (shutdown_tx, shutdown_rx) = shutdown::channel();
    tokio::spawn(signals::wait_for_shutdown(shutdown_tx));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown_rx, metrics_handle).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
