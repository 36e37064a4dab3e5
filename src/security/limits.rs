//! Request body size limit.
//!
//! # Responsibilities
//! - Build the `tower_http` layer enforcing `SecurityConfig::max_body_size`
//!
//! # Design Decisions
//! - Delegates to `tower_http::limit::RequestBodyLimitLayer`, which
//!   rejects with 413 Payload Too Large before the body is buffered

use tower_http::limit::RequestBodyLimitLayer;

use crate::config::schema::SecurityConfig;

pub fn body_limit_layer(config: &SecurityConfig) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(config.max_body_size)
}
