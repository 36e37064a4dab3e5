//! Smooth weighted round-robin load balancing strategy.
//!
//! On each call, under a mutex: every alive backend's `current` is
//! incremented by its weight and weights accumulate into `total`; the
//! backend with the greatest `current` is selected and `total` is
//! subtracted back out of it. This interleaves selections in
//! proportion to weight without bursting — e.g. weights 5,1,1 produce
//! the sequence A,A,B,A,C,A,A, repeating.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use crate::load_balancer::{alive_subset, backend::Backend, LoadBalancer};

#[derive(Debug, Default)]
pub struct Weighted {
    // Guards the read-modify-write sequence over backends' `current`
    // counters; the counters themselves are atomics so concurrent
    // readers elsewhere (e.g. admin inspection) don't need the lock.
    lock: Mutex<()>,
}

impl Weighted {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for Weighted {
    fn next(&self, backends: &[Arc<Backend>], _client_key: &str) -> Option<Arc<Backend>> {
        let alive = alive_subset(backends);
        if alive.is_empty() {
            return None;
        }

        let _guard = self.lock.lock().unwrap();

        let mut total: i64 = 0;
        let mut selected: Option<&Arc<Backend>> = None;
        let mut selected_current = i64::MIN;

        for backend in &alive {
            let weight = backend.weight() as i64;
            let updated = backend.current.fetch_add(weight, Ordering::Relaxed) + weight;
            total += weight;

            if updated > selected_current {
                selected_current = updated;
                selected = Some(backend);
            }
        }

        let selected = selected?;
        selected.current.fetch_sub(total, Ordering::Relaxed);
        Some((*selected).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_5_1_1_produce_the_spec_sequence() {
        let lb = Weighted::new();
        let a = Backend::new("http://a", 5);
        let b = Backend::new("http://b", 1);
        let c = Backend::new("http://c", 1);
        let backends = vec![a.clone(), b.clone(), c.clone()];

        let sequence: Vec<String> = (0..7)
            .map(|_| lb.next(&backends, "").unwrap().url.clone())
            .collect();

        assert_eq!(
            sequence,
            vec!["http://a", "http://a", "http://b", "http://a", "http://c", "http://a", "http://a"]
        );
    }

    #[test]
    fn window_of_w_requests_matches_weight_ratios() {
        let lb = Weighted::new();
        let a = Backend::new("http://a", 5);
        let b = Backend::new("http://b", 1);
        let c = Backend::new("http://c", 1);
        let backends = vec![a.clone(), b.clone(), c.clone()];

        let mut counts = std::collections::HashMap::new();
        for _ in 0..7 {
            let picked = lb.next(&backends, "").unwrap();
            *counts.entry(picked.url.clone()).or_insert(0) += 1;
        }

        assert_eq!(counts["http://a"], 5);
        assert_eq!(counts["http://b"], 1);
        assert_eq!(counts["http://c"], 1);
    }

    #[test]
    fn skips_dead_backends() {
        let lb = Weighted::new();
        let a = Backend::new("http://a", 5);
        let b = Backend::new("http://b", 1);
        a.set_alive(false);
        let backends = vec![a.clone(), b.clone()];

        for _ in 0..5 {
            assert_eq!(lb.next(&backends, "").unwrap().url, b.url);
        }
    }
}
