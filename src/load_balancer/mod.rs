//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched (routing::router)
//!     → balancer.next(backends, client_key)
//!         - round_robin.rs  (rotate through the alive subset)
//!         - least_conn.rs   (fewest in-flight requests)
//!         - weighted.rs     (smooth weighted round robin)
//!         - ip_hash.rs      (FNV-1a hash of client IP)
//!     → backend.rs (Backend record: alive flag, inflight counter)
//!     → Dispatcher increments inflight, forwards, decrements on exit
//! ```

pub mod backend;
pub mod ip_hash;
pub mod least_conn;
pub mod round_robin;
pub mod weighted;

use std::fmt::Debug;
use std::sync::Arc;

use backend::Backend;

use crate::config::schema::LbAlgorithm;

/// Interface implemented by every load-balancing algorithm.
///
/// `next` receives the full backend list (not just the alive subset)
/// so algorithms that need total-weight accounting (weighted) or a
/// stable index space (ip_hash) can compute over the live set
/// consistently; each implementation is responsible for filtering to
/// alive backends itself.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Select the next backend, or `None` if no backend is alive.
    /// `client_key` is the string used for stickiness by `ip_hash`
    /// and is ignored by the other policies.
    fn next(&self, backends: &[Arc<Backend>], client_key: &str) -> Option<Arc<Backend>>;
}

/// Construct the configured balancer implementation.
pub fn build(algorithm: LbAlgorithm) -> Box<dyn LoadBalancer> {
    match algorithm {
        LbAlgorithm::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        LbAlgorithm::LeastConn => Box::new(least_conn::LeastConnections::new()),
        LbAlgorithm::Weighted => Box::new(weighted::Weighted::new()),
        LbAlgorithm::IpHash => Box::new(ip_hash::IpHash::new()),
    }
}

/// Return the alive subset of `backends`, preserving order.
pub(crate) fn alive_subset(backends: &[Arc<Backend>]) -> Vec<&Arc<Backend>> {
    backends.iter().filter(|b| b.is_alive()).collect()
}
