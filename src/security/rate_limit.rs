//! Per-route rate limiting: token bucket, sliding window, and a
//! distributed sliding window over a pluggable remote store.
//!
//! # Design Decisions
//! - Different keys must not contend on the hot path: the map of
//!   per-key state sits behind a `RwLock` with a double-checked insert,
//!   while each key's own counters sit behind their own `Mutex`.
//! - The distributed variant fails open (admits) on store timeout or
//!   error: a backing-store outage must never become a gateway outage.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

use crate::config::schema::{RateLimitAlgorithm, RateLimitConfig, RateLimitKeyBy};

const REMOTE_STORE_TIMEOUT: Duration = Duration::from_millis(50);

/// Outcome of an `allow` check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allow,
    Deny { retry_after: Duration },
}

/// Derive the rate-limit key for a request per the configured policy.
pub fn derive_key(key_by: RateLimitKeyBy, headers: &HeaderMap, peer: SocketAddr) -> String {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);

    match key_by {
        RateLimitKeyBy::Ip => {
            let ip = header_str("x-forwarded-for").unwrap_or_else(|| peer.ip().to_string());
            format!("ip:{ip}")
        }
        RateLimitKeyBy::User => {
            format!("user:{}", header_str("x-user-id").unwrap_or_else(|| "anonymous".to_string()))
        }
        RateLimitKeyBy::ApiKey => {
            format!("apikey:{}", header_str("x-api-key").unwrap_or_else(|| "anonymous".to_string()))
        }
    }
}

/// Error surfaced by a `RemoteStore` implementation. Both variants
/// trigger fail-open at the call site.
#[derive(Debug, thiserror::Error)]
pub enum RemoteStoreError {
    #[error("remote store timed out")]
    Timeout,
    #[error("remote store error: {0}")]
    Backend(String),
}

/// Abstraction over a remote key-value store offering sorted-set
/// semantics, as used by the distributed sliding-window algorithm.
/// No production Redis client ships in this workspace's dependency
/// stack, so `InProcessStore` stands in as the default implementation;
/// a real client only needs to implement this trait.
#[async_trait::async_trait]
pub trait RemoteStore: Debug + Send + Sync {
    /// Atomically: evict entries older than `now - window`, check
    /// cardinality against `limit`, and admit-or-deny. On admit,
    /// record `now` with a TTL of `window`.
    async fn sliding_window_admit(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        limit: u32,
    ) -> Result<Decision, RemoteStoreError>;
}

/// Dashmap-backed stand-in for a remote sorted-set store, used when no
/// external store is wired up. Exercises the exact admit/evict/TTL
/// contract the distributed algorithm expects.
#[derive(Debug, Default)]
pub struct InProcessStore {
    sets: dashmap::DashMap<String, Vec<Instant>>,
}

impl InProcessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RemoteStore for InProcessStore {
    async fn sliding_window_admit(
        &self,
        key: &str,
        now: Instant,
        window: Duration,
        limit: u32,
    ) -> Result<Decision, RemoteStoreError> {
        let mut entry = self.sets.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < window);

        if entry.len() as u32 >= limit {
            let oldest = *entry.iter().min().expect("non-empty: len >= limit >= 1");
            let retry_after = window.saturating_sub(now.duration_since(oldest));
            return Ok(Decision::Deny { retry_after });
        }

        entry.push(now);
        Ok(Decision::Allow)
    }
}

struct TokenBucketState {
    tokens: f64,
    last_fill: Instant,
}

struct SlidingWindowState {
    admissions: VecDeque<Instant>,
}

enum Algorithm {
    TokenBucket {
        rate: f64,
        burst: f64,
        buckets: RwLock<HashMap<String, Mutex<TokenBucketState>>>,
    },
    SlidingWindow {
        rate: u32,
        window: Duration,
        buckets: RwLock<HashMap<String, Mutex<SlidingWindowState>>>,
    },
    Distributed {
        store: Arc<dyn RemoteStore>,
        rate: u32,
        window: Duration,
    },
}

/// A single route's rate limiter. Constructed once at route-table
/// build time and shared across requests for that route.
pub struct RateLimiter {
    key_by: RateLimitKeyBy,
    algorithm: Algorithm,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(InProcessStore::new()))
    }

    pub fn with_store(config: &RateLimitConfig, store: Arc<dyn RemoteStore>) -> Self {
        let window = humantime::parse_duration(&config.window).unwrap_or(Duration::from_secs(1));

        let algorithm = if config.redis_url.is_some() {
            Algorithm::Distributed {
                store,
                rate: config.rate,
                window,
            }
        } else {
            match config.algorithm {
                RateLimitAlgorithm::TokenBucket => Algorithm::TokenBucket {
                    rate: config.rate as f64,
                    burst: config.burst.max(1) as f64,
                    buckets: RwLock::new(HashMap::new()),
                },
                RateLimitAlgorithm::SlidingWindow => Algorithm::SlidingWindow {
                    rate: config.rate,
                    window,
                    buckets: RwLock::new(HashMap::new()),
                },
            }
        };

        Self {
            key_by: config.key_by,
            algorithm,
        }
    }

    pub fn key_by(&self) -> RateLimitKeyBy {
        self.key_by
    }

    pub async fn allow(&self, key: &str) -> Decision {
        match &self.algorithm {
            Algorithm::TokenBucket { rate, burst, buckets } => {
                Self::allow_token_bucket(key, *rate, *burst, buckets)
            }
            Algorithm::SlidingWindow { rate, window, buckets } => {
                Self::allow_sliding_window(key, *rate, *window, buckets)
            }
            Algorithm::Distributed { store, rate, window } => {
                Self::allow_distributed(store.as_ref(), key, *rate, *window).await
            }
        }
    }

    fn allow_token_bucket(
        key: &str,
        rate: f64,
        burst: f64,
        buckets: &RwLock<HashMap<String, Mutex<TokenBucketState>>>,
    ) -> Decision {
        {
            let read = buckets.read().unwrap();
            if let Some(state) = read.get(key) {
                return Self::take_token(&mut state.lock().unwrap(), rate, burst);
            }
        }

        let mut write = buckets.write().unwrap();
        let state = write.entry(key.to_string()).or_insert_with(|| {
            Mutex::new(TokenBucketState {
                tokens: burst,
                last_fill: Instant::now(),
            })
        });
        Self::take_token(state.get_mut().unwrap(), rate, burst)
    }

    fn take_token(state: &mut TokenBucketState, rate: f64, burst: f64) -> Decision {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_fill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * rate).min(burst);
        state.last_fill = now;

        if state.tokens < 1.0 {
            let retry_after = Duration::from_secs_f64(((1.0 - state.tokens) / rate).max(0.0));
            Decision::Deny { retry_after }
        } else {
            state.tokens -= 1.0;
            Decision::Allow
        }
    }

    fn allow_sliding_window(
        key: &str,
        rate: u32,
        window: Duration,
        buckets: &RwLock<HashMap<String, Mutex<SlidingWindowState>>>,
    ) -> Decision {
        {
            let read = buckets.read().unwrap();
            if let Some(state) = read.get(key) {
                return Self::admit_window(&mut state.lock().unwrap(), rate, window);
            }
        }

        let mut write = buckets.write().unwrap();
        let state = write
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(SlidingWindowState { admissions: VecDeque::new() }));
        Self::admit_window(state.get_mut().unwrap(), rate, window)
    }

    fn admit_window(state: &mut SlidingWindowState, rate: u32, window: Duration) -> Decision {
        let now = Instant::now();
        while let Some(&front) = state.admissions.front() {
            if now.duration_since(front) >= window {
                state.admissions.pop_front();
            } else {
                break;
            }
        }

        if state.admissions.len() as u32 >= rate {
            let oldest = *state.admissions.front().expect("non-empty: len >= rate >= 1");
            let retry_after = (oldest + window).saturating_duration_since(now);
            Decision::Deny { retry_after }
        } else {
            state.admissions.push_back(now);
            Decision::Allow
        }
    }

    async fn allow_distributed(store: &dyn RemoteStore, key: &str, rate: u32, window: Duration) -> Decision {
        let now = Instant::now();
        match tokio::time::timeout(REMOTE_STORE_TIMEOUT, store.sliding_window_admit(key, now, window, rate)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) | Err(_) => Decision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "127.0.0.1:1234".parse().unwrap()
    }

    #[test]
    fn derives_ip_key_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(derive_key(RateLimitKeyBy::Ip, &headers, peer()), "ip:9.9.9.9");
    }

    #[test]
    fn derives_ip_key_from_peer_when_header_absent() {
        let headers = HeaderMap::new();
        assert_eq!(derive_key(RateLimitKeyBy::Ip, &headers, peer()), "ip:127.0.0.1");
    }

    #[test]
    fn derives_anonymous_user_key_when_header_absent() {
        let headers = HeaderMap::new();
        assert_eq!(derive_key(RateLimitKeyBy::User, &headers, peer()), "user:anonymous");
    }

    fn token_bucket_config(rate: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            algorithm: RateLimitAlgorithm::TokenBucket,
            rate,
            burst,
            window: "1s".to_string(),
            key_by: RateLimitKeyBy::Ip,
            redis_url: None,
        }
    }

    #[tokio::test]
    async fn token_bucket_admits_burst_then_denies() {
        let limiter = RateLimiter::from_config(&token_bucket_config(1, 5));
        for _ in 0..5 {
            assert_eq!(limiter.allow("k").await, Decision::Allow);
        }
        match limiter.allow("k").await {
            Decision::Deny { retry_after } => assert!(retry_after > Duration::ZERO),
            Decision::Allow => panic!("expected deny after burst exhausted"),
        }
    }

    #[tokio::test]
    async fn token_bucket_keys_are_independent() {
        let limiter = RateLimiter::from_config(&token_bucket_config(1, 1));
        assert_eq!(limiter.allow("a").await, Decision::Allow);
        assert_eq!(limiter.allow("b").await, Decision::Allow);
    }

    fn sliding_window_config(rate: u32, window: &str) -> RateLimitConfig {
        RateLimitConfig {
            algorithm: RateLimitAlgorithm::SlidingWindow,
            rate,
            burst: 0,
            window: window.to_string(),
            key_by: RateLimitKeyBy::Ip,
            redis_url: None,
        }
    }

    #[tokio::test]
    async fn sliding_window_admits_up_to_rate_then_denies() {
        let limiter = RateLimiter::from_config(&sliding_window_config(3, "60s"));
        for _ in 0..3 {
            assert_eq!(limiter.allow("k").await, Decision::Allow);
        }
        assert!(matches!(limiter.allow("k").await, Decision::Deny { .. }));
    }

    #[derive(Debug)]
    struct AlwaysErrorsStore;

    #[async_trait::async_trait]
    impl RemoteStore for AlwaysErrorsStore {
        async fn sliding_window_admit(
            &self,
            _key: &str,
            _now: Instant,
            _window: Duration,
            _limit: u32,
        ) -> Result<Decision, RemoteStoreError> {
            Err(RemoteStoreError::Backend("down".to_string()))
        }
    }

    #[tokio::test]
    async fn distributed_fails_open_on_store_error() {
        let config = RateLimitConfig {
            algorithm: RateLimitAlgorithm::SlidingWindow,
            rate: 1,
            burst: 0,
            window: "1s".to_string(),
            key_by: RateLimitKeyBy::Ip,
            redis_url: Some("redis://localhost".to_string()),
        };
        let limiter = RateLimiter::with_store(&config, Arc::new(AlwaysErrorsStore));
        assert_eq!(limiter.allow("k").await, Decision::Allow);
        assert_eq!(limiter.allow("k").await, Decision::Allow);
    }

    #[tokio::test]
    async fn in_process_store_enforces_limit_and_reports_retry_after() {
        let store = InProcessStore::new();
        let now = Instant::now();
        for _ in 0..2 {
            assert_eq!(
                store.sliding_window_admit("k", now, Duration::from_secs(60), 2).await.unwrap(),
                Decision::Allow
            );
        }
        match store.sliding_window_admit("k", now, Duration::from_secs(60), 2).await.unwrap() {
            Decision::Deny { retry_after } => assert!(retry_after <= Duration::from_secs(60)),
            Decision::Allow => panic!("expected deny at capacity"),
        }
    }
}
