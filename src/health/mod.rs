//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (+ immediate probe at construction)
//!     → Probe each backend
//!     → state::set_alive
//!
//! Passive observation (passive.rs):
//!     Data-plane response/error observed by the dispatcher
//!     → classify as Success/Failure
//!     → record against the breaker; on failure, state::set_alive(false)
//! ```
//!
//! # Design Decisions
//! - No hysteresis: a single probe or a single 5xx flips `alive`
//!   directly, no consecutive-count thresholds
//! - Health state (`alive`) is per-backend, not per-route

pub mod active;
pub mod passive;
pub mod state;
