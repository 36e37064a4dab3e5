//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Honor `LoggingConfig`'s level and format (text/json)
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set, matching
//!   every other `tracing_subscriber::EnvFilter` consumer
//! - JSON format for production log aggregation, text for local runs

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::schema::LoggingConfig;

/// Install the global tracing subscriber. Call once, at process start.
pub fn init(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
