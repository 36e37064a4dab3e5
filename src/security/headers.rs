//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Append to X-Forwarded-For, set X-Forwarded-Proto/X-Forwarded-Host
//! - Strip hop-by-hop headers before forwarding in either direction
//!
//! # Design Decisions
//! - Append rather than overwrite X-Forwarded-For so multi-hop chains
//!   are preserved
//! - Hop-by-hop headers per RFC 7230 §6.1 are never forwarded

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::net::IpAddr;

/// Headers meaningful only to the immediate connection, never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Add/extend `X-Forwarded-For`, and set `X-Forwarded-Proto` /
/// `X-Forwarded-Host` from the inbound request.
pub fn apply_forwarded_headers(headers: &mut HeaderMap, client_ip: IpAddr, proto: &str, host: Option<&str>) {
    let forwarded_for = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(HeaderName::from_static("x-forwarded-for"), value);
    }

    if let Ok(value) = HeaderValue::from_str(proto) {
        headers.insert(HeaderName::from_static("x-forwarded-proto"), value);
    }

    if let Some(host) = host {
        if let Ok(value) = HeaderValue::from_str(host) {
            headers.insert(HeaderName::from_static("x-forwarded-host"), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key("connection"));
        assert!(headers.contains_key("content-type"));
    }

    #[test]
    fn sets_forwarded_headers_on_first_hop() {
        let mut headers = HeaderMap::new();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        apply_forwarded_headers(&mut headers, ip, "https", Some("gateway.example.com"));

        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.5");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "https");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "gateway.example.com");
    }

    #[test]
    fn extends_existing_forwarded_for_chain() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1"));
        let ip: IpAddr = "2.2.2.2".parse().unwrap();
        apply_forwarded_headers(&mut headers, ip, "http", None);

        assert_eq!(headers.get("x-forwarded-for").unwrap(), "1.1.1.1, 2.2.2.2");
    }
}
