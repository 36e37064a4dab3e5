//! Data-plane observation hook.
//!
//! On a 5xx response or transport error, the dispatcher both records a
//! circuit-breaker failure and flips `alive = false` directly,
//! relying on the next active-health tick to restore it. This couples
//! health to data-plane outcome and can exclude a backend for up to
//! one check interval on a single transient 5xx — preserved
//! deliberately for compatibility with the source behavior.
//!
//! 4xx responses are never treated as backend failures. A successful
//! response (status < 500) also marks the backend alive directly,
//! rather than waiting for the next active probe.

use std::sync::Arc;

use crate::health::state;
use crate::load_balancer::backend::Backend;
use crate::resilience::circuit_breaker::CircuitBreaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Classify a response status as a data-plane outcome. Only transport
/// errors (call this with `Outcome::Failure` directly) and 5xx count.
pub fn classify_status(status: u16) -> Outcome {
    if status >= 500 {
        Outcome::Failure
    } else {
        Outcome::Success
    }
}

/// Record a data-plane outcome against the breaker and, on failure,
/// flip the backend's `alive` flag.
pub fn observe(backend: &Arc<Backend>, breaker: &CircuitBreaker, outcome: Outcome, route: &str) {
    match outcome {
        Outcome::Success => {
            breaker.record_success();
            state::set_alive(backend, true, route);
        }
        Outcome::Failure => {
            breaker.record_failure();
            state::set_alive(backend, false, route);
        }
    }
}
