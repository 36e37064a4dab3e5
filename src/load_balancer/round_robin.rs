//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{alive_subset, backend::Backend, LoadBalancer};

/// Round-robin selector.
///
/// Snapshots the alive subset on each call and returns
/// `alive[counter++ mod len(alive)]`. The counter is a single atomic
/// fetch-add; no lock is required on the hot path beyond whatever the
/// caller already holds on the backend slice.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next(&self, backends: &[Arc<Backend>], _client_key: &str) -> Option<Arc<Backend>> {
        let alive = alive_subset(backends);
        if alive.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % alive.len();
        Some(alive[index].clone())
    }
}
