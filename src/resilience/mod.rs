//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce per-route deadline)
//!     → circuit_breaker.rs (track failures, open circuit if threshold exceeded)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Nothing is retried by the core; a failed dispatch is reported to
//!   the caller and recorded against the breaker, full stop
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod timeouts;
