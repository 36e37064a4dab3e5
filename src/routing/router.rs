//! Route table: compiled routes plus live reconfiguration.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a request path (longest-prefix)
//! - Rebuild a table from a new config descriptor, preserving backend
//!   and circuit-breaker identity across reload
//!
//! # Design Decisions
//! - Immutable once built; a reload produces an entirely new
//!   `RouteTable` that the caller swaps in behind an `ArcSwap` (see
//!   `dispatch::Gateway`) so no request ever observes a half-swapped
//!   table
//! - Backend and breaker identity is `(route_prefix, backend_url)`:
//!   rebuilding a route whose prefix survived reuses the previous
//!   `Arc<Backend>` / `Arc<CircuitBreaker>`, so `alive`, `inflight`,
//!   and breaker state carry over a config reload
//! - O(n) path prefix scan (acceptable for typical route counts)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{HealthCheckConfig, ProxyConfig, RouteConfig};
use crate::health::active::HealthMonitor;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::LoadBalancer;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::routing::matcher;
use crate::security::rate_limit::RateLimiter;

/// A single configured route: a path prefix bound to a load balancer,
/// an optional rate limiter, and a per-backend circuit breaker.
pub struct Route {
    pub name: String,
    pub path_prefix: String,
    pub strip_prefix: bool,
    pub timeout: Duration,
    pub backends: Vec<Arc<Backend>>,
    pub balancer: Box<dyn LoadBalancer>,
    pub rate_limiter: Option<RateLimiter>,
    breakers: HashMap<String, Arc<CircuitBreaker>>,
    pub health_monitor: Arc<HealthMonitor>,
}

impl Route {
    /// The circuit breaker for `backend_url`. Every URL in
    /// `self.backends` has an entry by construction (the data-model
    /// invariant in §3: every backend the breaker map references is
    /// present in the balancer's backend list).
    pub fn breaker(&self, backend_url: &str) -> &Arc<CircuitBreaker> {
        self.breakers
            .get(backend_url)
            .expect("every route backend has a breaker entry")
    }

    fn build(config: &RouteConfig, previous: Option<&Route>, health_check: &HealthCheckConfig) -> Self {
        let backends: Vec<Arc<Backend>> = config
            .backends
            .iter()
            .map(|b| match previous.and_then(|p| p.backends.iter().find(|existing| existing.url == b.url)) {
                Some(existing) => {
                    existing.set_weight(b.weight);
                    existing.clone()
                }
                None => Backend::new(b.url.clone(), b.weight),
            })
            .collect();

        let breakers: HashMap<String, Arc<CircuitBreaker>> = backends
            .iter()
            .map(|backend| {
                let breaker = previous
                    .and_then(|p| p.breakers.get(&backend.url))
                    .cloned()
                    .unwrap_or_else(|| Arc::new(CircuitBreaker::new(config.circuit_breaker.clone())));
                (backend.url.clone(), breaker)
            })
            .collect();

        let health_monitor = match previous {
            Some(prev) => {
                prev.health_monitor.update(backends.clone());
                prev.health_monitor.clone()
            }
            None => HealthMonitor::new(config.name.clone(), backends.clone(), health_check.clone()),
        };

        Self {
            name: config.name.clone(),
            path_prefix: config.path_prefix.clone(),
            strip_prefix: config.strip_prefix,
            timeout: Duration::from_secs(config.timeout_seconds),
            backends,
            balancer: crate::load_balancer::build(config.lb_algorithm),
            rate_limiter: config.rate_limit.as_ref().map(RateLimiter::from_config),
            breakers,
            health_monitor,
        }
    }
}

/// Ordered collection of routes, replaced atomically on reload.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a route table from `config`, reusing backend and breaker
    /// identity from `previous` for any route whose prefix is
    /// unchanged. Pass `None` for the first build at startup.
    pub fn build(config: &ProxyConfig, previous: Option<&RouteTable>) -> Self {
        let routes = config
            .routes
            .iter()
            .map(|route_config| {
                let prev_route = previous.and_then(|p| p.find_by_prefix(&route_config.path_prefix));
                Route::build(route_config, prev_route, &config.health_check)
            })
            .collect();

        Self { routes }
    }

    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path_prefix == prefix)
    }

    /// Longest-prefix match among configured routes; ties break by
    /// earlier configuration order. `None` if no route matches.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        let candidates = self.routes.iter().enumerate().map(|(i, r)| (r.path_prefix.as_str(), i));
        matcher::best_match(candidates, path).map(|i| &self.routes[i])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LbAlgorithm, RouteBackendConfig};

    fn route_config(name: &str, prefix: &str, url: &str) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            path_prefix: prefix.to_string(),
            backends: vec![RouteBackendConfig { url: url.to_string(), weight: 1 }],
            lb_algorithm: LbAlgorithm::RoundRobin,
            timeout_seconds: 30,
            strip_prefix: false,
            rate_limit: None,
            circuit_breaker: None,
        }
    }

    fn config_with(routes: Vec<RouteConfig>) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.health_check.enabled = false;
        config.routes = routes;
        config
    }

    #[test]
    fn matches_longest_prefix() {
        let config = config_with(vec![
            route_config("r1", "/api", "http://a"),
            route_config("r2", "/api/v2", "http://b"),
            route_config("r3", "/", "http://c"),
        ]);
        let table = RouteTable::build(&config, None);

        assert_eq!(table.match_path("/api/v2/users").unwrap().name, "r2");
        assert_eq!(table.match_path("/api/other").unwrap().name, "r1");
        assert_eq!(table.match_path("/elsewhere").unwrap().name, "r3");
    }

    #[test]
    fn no_match_returns_none() {
        let config = config_with(vec![route_config("r1", "/api", "http://a")]);
        let table = RouteTable::build(&config, None);
        assert!(table.match_path("/other").is_none());
    }

    #[test]
    fn reload_preserves_backend_identity_for_unchanged_url() {
        let config = config_with(vec![route_config("r1", "/api", "http://a")]);
        let first = RouteTable::build(&config, None);
        first.find_by_prefix("/api").unwrap().backends[0].set_alive(false);

        let second = RouteTable::build(&config, Some(&first));
        let backend = &second.find_by_prefix("/api").unwrap().backends[0];
        assert!(!backend.is_alive(), "alive flag should survive reload for an unchanged backend URL");
    }

    #[test]
    fn reload_starts_fresh_breaker_for_new_backend_url() {
        let old_config = config_with(vec![route_config("r1", "/api", "http://a")]);
        let first = RouteTable::build(&old_config, None);

        let new_config = config_with(vec![route_config("r1", "/api", "http://c")]);
        let second = RouteTable::build(&new_config, Some(&first));
        let route = second.find_by_prefix("/api").unwrap();
        assert_eq!(route.breaker("http://c").state(), "disabled");
    }
}
