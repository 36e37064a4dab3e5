//! IP-hash load balancing strategy.
//!
//! Hashes `client_key` with FNV-1a and picks `alive[hash % len(alive)]`,
//! giving the same client a stable backend as long as the alive set is
//! unchanged.

use std::sync::Arc;

use crate::load_balancer::{alive_subset, backend::Backend, LoadBalancer};

const FNV_OFFSET_BASIS: u32 = 0x811C9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a(key: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for IpHash {
    fn next(&self, backends: &[Arc<Backend>], client_key: &str) -> Option<Arc<Backend>> {
        let alive = alive_subset(backends);
        if alive.is_empty() {
            return None;
        }

        let index = (fnv1a(client_key) as usize) % alive.len();
        Some(alive[index].clone())
    }
}
