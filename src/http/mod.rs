//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, listener bind, graceful shutdown)
//!     → dispatch::Gateway (request ID, routing, forwarding, headers)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - HTTP/1.1 and HTTP/2 supported via Axum/hyper
//! - Request size limits enforced before full parse
//! - Request ID generated for every request (correlation)

pub mod server;

pub use server::HttpServer;
