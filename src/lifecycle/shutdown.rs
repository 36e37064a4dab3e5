//! Graceful shutdown orchestration.
//!
//! # Shutdown Sequence
//! 1. `lifecycle::signals` observes SIGTERM/SIGINT and broadcasts once
//! 2. Data-plane and admin listeners stop accepting new connections
//! 3. In-flight requests drain, bounded by `DRAIN_TIMEOUT`
//! 4. Health-checker tasks stop
//! 5. Process exits
//!
//! # Design Decisions
//! - A `broadcast` channel fans the single shutdown signal out to the
//!   data-plane server, the admin server, and the config-reload task,
//!   each of which holds its own subscription (`resubscribe()`)
//! - Drain has a hard timeout: requests still in flight past
//!   `DRAIN_TIMEOUT` are dropped when the process exits

use std::time::Duration;

use tokio::sync::broadcast;

/// Upper bound on how long a graceful shutdown waits for in-flight
/// requests to finish before the listener is forced closed (§5).
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shutdown broadcast channel. The sender is driven by
/// `lifecycle::signals::wait_for_shutdown`; every subsystem that needs
/// to observe shutdown holds a `resubscribe()`d receiver.
pub fn channel() -> (broadcast::Sender<()>, broadcast::Receiver<()>) {
    broadcast::channel(1)
}
