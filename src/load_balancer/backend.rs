//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream backend server, identified by URL
//! - Track liveness (health checker + data-plane outcomes) and
//!   in-flight request count (least-conn load balancing)
//! - Carry the signed `current` counter used by smooth weighted
//!   round robin

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// A single upstream backend server.
///
/// Identity is the URL, not the struct address: route-table rebuilds
/// reuse the same `Arc<Backend>` for any URL that existed in the
/// previous route with the same prefix, so `alive` and `inflight`
/// survive a config reload (see `routing::router`). Weight is the one
/// field a reload is allowed to change in place, so it is atomic too.
#[derive(Debug)]
pub struct Backend {
    /// Absolute backend URL, e.g. "http://127.0.0.1:3000".
    pub url: String,

    /// Configured weight (>= 1), used by the weighted balancer.
    /// Mutated only by reload.
    weight: AtomicU32,

    /// Whether this backend is currently considered healthy.
    /// Initial value: true.
    alive: AtomicBool,

    /// Number of requests currently in flight to this backend.
    inflight: AtomicUsize,

    /// Smooth weighted round-robin's per-backend running counter.
    /// Mutated only under the weighted balancer's mutex.
    pub(crate) current: AtomicI64,
}

impl Backend {
    pub fn new(url: impl Into<String>, weight: u32) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            weight: AtomicU32::new(weight.max(1)),
            alive: AtomicBool::new(true),
            inflight: AtomicUsize::new(0),
            current: AtomicI64::new(0),
        })
    }

    pub fn weight(&self) -> u32 {
        self.weight.load(Ordering::Relaxed)
    }

    pub fn set_weight(&self, weight: u32) {
        self.weight.store(weight.max(1), Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }

    pub fn inc_inflight(&self) {
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_inflight(&self) {
        // Never let the counter go negative; a stray decrement
        // without a matching increment would otherwise wrap.
        let _ = self
            .inflight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// RAII guard that decrements `inflight` on drop, guaranteeing the
/// decrement happens on every exit path (success, error, or panic)
/// once a request has been dispatched to a backend.
#[derive(Debug)]
pub struct InflightGuard {
    backend: Arc<Backend>,
}

impl InflightGuard {
    pub fn new(backend: Arc<Backend>) -> Self {
        backend.inc_inflight();
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.backend.dec_inflight();
    }
}
