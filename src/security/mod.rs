//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (reject oversized bodies before buffering)
//!     → rate_limit.rs (per-route key derivation + admit/deny)
//!     → headers.rs (forwarded-header construction, hop-by-hop strip)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Rate limiter fails open on a distributed-store outage; everything
//!   else fails closed
//! - No trust in client-supplied X-Forwarded-* on the inbound side

pub mod headers;
pub mod limits;
pub mod rate_limit;
