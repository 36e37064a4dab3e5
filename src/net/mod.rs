//! Network layer subsystem.
//!
//! # Design Decisions
//! - TLS is optional and handled transparently by `tls.rs`; the data
//!   plane binds its own `TcpListener` directly (see `http::server`)
//!   and hands accepted connections to `axum_server`/`axum::serve`

pub mod tls;
