//! Configuration validation logic.

use crate::config::schema::ProxyConfig;
use std::collections::HashSet;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a ProxyConfig for semantic correctness.
///
/// Syntactic correctness (types, required fields) is already enforced
/// by serde during deserialization; this pass checks the cross-field
/// invariants serde cannot express.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen_names = HashSet::new();

    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError("route name must not be empty".to_string()));
        }
        if !seen_names.insert(route.name.clone()) {
            errors.push(ValidationError(format!(
                "duplicate route name '{}'",
                route.name
            )));
        }

        if route.path_prefix.is_empty() {
            errors.push(ValidationError(format!(
                "route '{}': path_prefix must not be empty",
                route.name
            )));
        }

        if route.backends.is_empty() {
            errors.push(ValidationError(format!(
                "route '{}': at least one backend is required",
                route.name
            )));
        }

        let mut backend_urls = HashSet::new();
        for backend in &route.backends {
            if url::Url::parse(&backend.url).is_err() {
                errors.push(ValidationError(format!(
                    "route '{}': invalid backend URL '{}'",
                    route.name, backend.url
                )));
            }
            if backend.weight == 0 {
                errors.push(ValidationError(format!(
                    "route '{}': backend '{}' weight must be >= 1",
                    route.name, backend.url
                )));
            }
            if !backend_urls.insert(backend.url.clone()) {
                errors.push(ValidationError(format!(
                    "route '{}': duplicate backend URL '{}'",
                    route.name, backend.url
                )));
            }
        }

        if route.timeout_seconds == 0 {
            errors.push(ValidationError(format!(
                "route '{}': timeout_seconds must be > 0",
                route.name
            )));
        }

        if let Some(rl) = &route.rate_limit {
            if rl.rate == 0 {
                errors.push(ValidationError(format!(
                    "route '{}': rate_limit.rate must be > 0",
                    route.name
                )));
            }
            if humantime::parse_duration(&rl.window).is_err() {
                errors.push(ValidationError(format!(
                    "route '{}': rate_limit.window '{}' is not a valid duration",
                    route.name, rl.window
                )));
            }
        }

        if let Some(cb) = &route.circuit_breaker {
            if cb.failure_threshold > 100 {
                errors.push(ValidationError(format!(
                    "route '{}': circuit_breaker.failure_threshold must be <= 100",
                    route.name
                )));
            }
            if cb.half_open_requests == 0 {
                errors.push(ValidationError(format!(
                    "route '{}': circuit_breaker.half_open_requests must be >= 1",
                    route.name
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::*;

    fn backend(url: &str) -> RouteBackendConfig {
        RouteBackendConfig {
            url: url.to_string(),
            weight: 1,
        }
    }

    fn base_route() -> RouteConfig {
        RouteConfig {
            name: "r1".into(),
            path_prefix: "/".into(),
            backends: vec![backend("http://127.0.0.1:80")],
            lb_algorithm: LbAlgorithm::RoundRobin,
            timeout_seconds: 30,
            strip_prefix: false,
            rate_limit: None,
            circuit_breaker: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let mut config = ProxyConfig::default();
        config.routes.push(base_route());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_backends_rejected() {
        let mut config = ProxyConfig::default();
        let mut route = base_route();
        route.backends.clear();
        config.routes.push(route);

        let errs = validate_config(&config).unwrap_err();
        assert!(errs.iter().any(|e| e.0.contains("at least one backend")));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let mut config = ProxyConfig::default();
        let mut route = base_route();
        route.rate_limit = Some(RateLimitConfig {
            window: "not-a-duration".into(),
            ..Default::default()
        });
        config.routes.push(route);

        let errs = validate_config(&config).unwrap_err();
        assert!(errs.iter().any(|e| e.0.contains("not a valid duration")));
    }

    #[test]
    fn test_duplicate_route_names_rejected() {
        let mut config = ProxyConfig::default();
        config.routes.push(base_route());
        config.routes.push(base_route());

        let errs = validate_config(&config).unwrap_err();
        assert!(errs.iter().any(|e| e.0.contains("duplicate route name")));
    }
}
