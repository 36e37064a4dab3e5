//! Backend liveness transitions and their log events.
//!
//! There is no separate health state machine: `alive` lives directly
//! on `load_balancer::backend::Backend` as an atomic, read lock-free
//! by the balancer on every request. This module only wraps the
//! transition so it is logged exactly once, from whichever caller
//! (active checker or data-plane observation) flips it.

use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Set `backend.alive`, logging a "recovered" event when it flips
/// from not-alive to alive, and a "marked unhealthy" event on the
/// reverse transition. A no-op transition (no change) logs nothing.
pub fn set_alive(backend: &Arc<Backend>, alive: bool, route: &str) {
    let was_alive = backend.is_alive();
    if was_alive == alive {
        return;
    }

    backend.set_alive(alive);

    if alive {
        tracing::info!(route, backend = %backend.url, "backend recovered");
    } else {
        tracing::warn!(route, backend = %backend.url, "backend marked unhealthy");
    }
}
