//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS, connection limits).
    pub listener: ListenerConfig,

    /// Admin surface configuration (separate port).
    pub admin: AdminConfig,

    /// Structured logging configuration.
    pub logging: LoggingConfig,

    /// Route definitions, each owning its own backends, load-balancer
    /// policy, and optional rate limiter / circuit breaker.
    pub routes: Vec<RouteConfig>,

    /// Active health-check defaults applied to every route.
    pub health_check: HealthCheckConfig,

    /// Transport-level timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings (metrics exposition).
    pub observability: ObservabilityConfig,

    /// Security hardening (body size limits, forwarded headers).
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent in-flight requests admitted to the data
    /// plane (backpressure). Requests beyond this bound queue rather
    /// than being accepted and left to pile up unbounded.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format: "text" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// A single upstream backend attached to a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteBackendConfig {
    /// Absolute backend URL (e.g., "http://127.0.0.1:3000"). Stable
    /// identity across reloads: see `(route_prefix, backend_url)` in
    /// the routing module.
    pub url: String,

    /// Weight for the weighted load-balancer policy (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Load-balancing algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LbAlgorithm {
    #[default]
    RoundRobin,
    LeastConn,
    Weighted,
    IpHash,
}

/// Rate-limit algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAlgorithm {
    #[default]
    TokenBucket,
    SlidingWindow,
}

/// Rate-limit key derivation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKeyBy {
    #[default]
    Ip,
    User,
    ApiKey,
}

/// Per-route rate-limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub algorithm: RateLimitAlgorithm,

    /// Requests per second (token bucket refill rate, or sliding
    /// window admission count).
    pub rate: u32,

    /// Burst capacity (token bucket only).
    pub burst: u32,

    /// Sliding window duration, e.g. "1s", "60s". Parsed by
    /// `humantime`-style suffix parsing in `loader`.
    pub window: String,

    pub key_by: RateLimitKeyBy,

    /// Optional remote key-value store URL. When set, the limiter
    /// runs the distributed sliding-window algorithm instead of a
    /// local bucket. See `security::rate_limit::remote`.
    pub redis_url: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            algorithm: RateLimitAlgorithm::TokenBucket,
            rate: 100,
            burst: 50,
            window: "1s".to_string(),
            key_by: RateLimitKeyBy::Ip,
            redis_url: None,
        }
    }
}

/// Per-route circuit-breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure percentage (0-100) that trips the breaker.
    pub failure_threshold: u32,

    /// Minimum observations in the rolling window before the
    /// threshold is evaluated.
    pub min_requests: u32,

    /// How long the breaker stays Open before probing.
    pub open_duration_seconds: u64,

    /// Number of probe admits allowed while Half-Open.
    pub half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 50,
            min_requests: 20,
            open_duration_seconds: 30,
            half_open_requests: 5,
        }
    }
}

/// Route configuration: a path prefix bound to a balancer, an
/// optional rate limiter, and an optional circuit-breaker template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (non-empty, required).
    pub path_prefix: String,

    /// Backends this route forwards to (at least one required).
    pub backends: Vec<RouteBackendConfig>,

    /// Load-balancing algorithm for this route.
    #[serde(default)]
    pub lb_algorithm: LbAlgorithm,

    /// Per-request timeout in seconds.
    #[serde(default = "default_route_timeout")]
    pub timeout_seconds: u64,

    /// Strip the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// Optional rate limiter.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Optional circuit breaker.
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

fn default_route_timeout() -> u64 {
    30
}

/// Health-check defaults applied to every route's background checker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds (spec default: 10).
    pub interval_secs: u64,

    /// Health check timeout in seconds (spec default: 3).
    pub timeout_secs: u64,

    /// Path appended to the backend URL to probe, e.g. "/health".
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 3,
            path: "/health".to_string(),
        }
    }
}

/// Transport-level timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Idle connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            idle_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin surface configuration (separate port).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin surface.
    pub enabled: bool,

    /// Admin surface bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
