//! Least-connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{alive_subset, backend::Backend, LoadBalancer};

/// Over the alive subset, selects the backend with the minimum
/// in-flight count; ties break by first occurrence. Pure read of
/// atomics, no locking.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next(&self, backends: &[Arc<Backend>], _client_key: &str) -> Option<Arc<Backend>> {
        alive_subset(backends)
            .into_iter()
            .min_by_key(|b| b.inflight())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::InflightGuard;

    #[test]
    fn picks_backend_with_fewest_inflight() {
        let lb = LeastConnections::new();
        let b1 = Backend::new("http://a", 1);
        let b2 = Backend::new("http://b", 1);
        let _g = InflightGuard::new(b1.clone());

        let backends = vec![b1.clone(), b2.clone()];
        assert_eq!(lb.next(&backends, "").unwrap().url, b2.url);
    }

    #[test]
    fn ties_break_by_first_occurrence() {
        let lb = LeastConnections::new();
        let b1 = Backend::new("http://a", 1);
        let b2 = Backend::new("http://b", 1);
        let backends = vec![b1.clone(), b2.clone()];

        assert_eq!(lb.next(&backends, "").unwrap().url, b1.url);
    }

    #[test]
    fn ignores_dead_backends() {
        let lb = LeastConnections::new();
        let b1 = Backend::new("http://a", 1);
        let b2 = Backend::new("http://b", 1);
        b1.set_alive(false);
        let backends = vec![b1.clone(), b2.clone()];

        assert_eq!(lb.next(&backends, "").unwrap().url, b2.url);
    }
}
