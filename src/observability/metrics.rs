//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder and serve `/metrics` text
//!   exposition on the admin surface
//! - Record the three series the core contracts for: request counter,
//!   duration histogram, and an active-connection gauge
//!
//! # Design Decisions
//! - Label cardinality stays bounded: `route` is the configured route
//!   name, never the raw request path
//! - Histogram buckets are fixed at install time to match the
//!   published contract exactly

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const REQUEST_DURATION_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the global Prometheus recorder. Returns a handle whose
/// `render()` produces the exposition text for `GET /metrics`.
pub fn install() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("gateway_request_duration_seconds".to_string()),
            REQUEST_DURATION_BUCKETS,
        )
        .expect("bucket list is non-empty")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record one forwarded-or-rejected request's outcome.
pub fn record_request(route: &str, method: &str, status: u16, elapsed: Duration) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "route" => route.to_string(),
        "method" => method.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn inc_active_connections() {
    gauge!("gateway_active_connections").increment(1.0);
}

pub fn dec_active_connections() {
    gauge!("gateway_active_connections").decrement(1.0);
}
