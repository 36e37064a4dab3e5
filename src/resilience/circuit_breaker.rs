//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures*100/count >= failure_threshold (and count >= min_requests)
//! Open → Half-Open: after open_duration, on next allow()
//! Half-Open → Closed: probe_total - probe_failures >= half_open_requests
//! Half-Open → Open: any probe failure
//! ```
//!
//! Per-backend, not global. All state lives behind one mutex so an
//! admit/record pair for concurrent requests linearises.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::schema::CircuitBreakerConfig;

const WINDOW_HORIZON: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Outcome of an `allow()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Deny,
}

#[derive(Debug)]
struct Observation {
    at: Instant,
    success: bool,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    window: Vec<Observation>,
    open_at: Option<Instant>,
    probe_total: u32,
    probe_failures: u32,
}

impl Inner {
    fn evict_stale(&mut self, now: Instant) {
        self.window.retain(|obs| now.duration_since(obs.at) <= WINDOW_HORIZON);
    }
}

/// Per-backend circuit breaker. If no config is supplied, every method
/// is a no-op and `state()` reports `"disabled"`.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: Option<CircuitBreakerConfig>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: Option<CircuitBreakerConfig>) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: Vec::new(),
                open_at: None,
                probe_total: 0,
                probe_failures: 0,
            }),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Current state, or `"disabled"` if unconfigured.
    pub fn state(&self) -> &'static str {
        match &self.config {
            None => "disabled",
            Some(_) => self.inner.lock().unwrap().state.as_str(),
        }
    }

    /// Decide whether a request may proceed to the backend.
    pub fn allow(&self) -> Admission {
        let config = match &self.config {
            None => return Admission::Admit,
            Some(c) => c,
        };

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => Admission::Admit,
            CircuitState::Open => {
                let open_at = inner.open_at.expect("open_at set when entering Open");
                if open_at.elapsed() > Duration::from_secs(config.open_duration_seconds) {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_total = 0;
                    inner.probe_failures = 0;
                    inner.probe_total += 1;
                    Admission::Admit
                } else {
                    Admission::Deny
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_total < config.half_open_requests {
                    inner.probe_total += 1;
                    Admission::Admit
                } else {
                    Admission::Deny
                }
            }
        }
    }

    pub fn record_success(&self) {
        let config = match &self.config {
            None => return,
            Some(c) => c,
        };

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                let now = Instant::now();
                inner.window.push(Observation { at: now, success: true });
                inner.evict_stale(now);
            }
            CircuitState::Open => {}
            CircuitState::HalfOpen => {
                if inner.probe_total - inner.probe_failures >= config.half_open_requests {
                    inner.state = CircuitState::Closed;
                    inner.window.clear();
                    inner.probe_total = 0;
                    inner.probe_failures = 0;
                }
            }
        }
    }

    pub fn record_failure(&self) {
        let config = match &self.config {
            None => return,
            Some(c) => c,
        };

        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                let now = Instant::now();
                inner.window.push(Observation { at: now, success: false });
                inner.evict_stale(now);

                let count = inner.window.len() as u32;
                let failures = inner.window.iter().filter(|o| !o.success).count() as u32;
                if count >= config.min_requests && failures * 100 / count >= config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.window.clear();
                    inner.open_at = Some(now);
                }
            }
            CircuitState::Open => {}
            CircuitState::HalfOpen => {
                inner.probe_failures += 1;
                inner.state = CircuitState::Open;
                inner.open_at = Some(Instant::now());
                inner.window.clear();
                inner.probe_total = 0;
                inner.probe_failures = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(failure_threshold: u32, min_requests: u32, open_duration_seconds: u64, half_open_requests: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            min_requests,
            open_duration_seconds,
            half_open_requests,
        }
    }

    #[test]
    fn disabled_breaker_always_admits() {
        let breaker = CircuitBreaker::disabled();
        assert_eq!(breaker.allow(), Admission::Admit);
        breaker.record_failure();
        assert_eq!(breaker.allow(), Admission::Admit);
        assert_eq!(breaker.state(), "disabled");
    }

    #[test]
    fn trips_open_after_threshold_breached() {
        let breaker = CircuitBreaker::new(Some(config(50, 4, 30, 5)));
        for _ in 0..2 {
            assert_eq!(breaker.allow(), Admission::Admit);
            breaker.record_success();
        }
        for _ in 0..2 {
            assert_eq!(breaker.allow(), Admission::Admit);
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), "open");
        assert_eq!(breaker.allow(), Admission::Deny);
    }

    #[test]
    fn stays_closed_below_min_requests() {
        let breaker = CircuitBreaker::new(Some(config(50, 20, 30, 5)));
        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), "closed");
    }

    #[test]
    fn open_denies_until_duration_elapses_then_half_opens() {
        let breaker = CircuitBreaker::new(Some(config(50, 1, 0, 5)));
        breaker.record_failure();
        assert_eq!(breaker.state(), "open");
        // open_duration_seconds = 0, so the very next allow() transitions.
        assert_eq!(breaker.allow(), Admission::Admit);
        assert_eq!(breaker.state(), "half_open");
    }

    #[test]
    fn half_open_closes_after_enough_successful_probes() {
        let breaker = CircuitBreaker::new(Some(config(50, 1, 0, 2)));
        breaker.record_failure();
        assert_eq!(breaker.allow(), Admission::Admit); // -> half_open, probe 1
        breaker.record_success();
        assert_eq!(breaker.state(), "half_open");
        assert_eq!(breaker.allow(), Admission::Admit); // probe 2
        breaker.record_success();
        assert_eq!(breaker.state(), "closed");
    }

    #[test]
    fn half_open_reopens_immediately_on_probe_failure() {
        let breaker = CircuitBreaker::new(Some(config(50, 1, 0, 5)));
        breaker.record_failure();
        assert_eq!(breaker.allow(), Admission::Admit); // -> half_open
        breaker.record_failure();
        assert_eq!(breaker.state(), "open");
    }

    #[test]
    fn half_open_denies_beyond_probe_budget() {
        let breaker = CircuitBreaker::new(Some(config(50, 1, 0, 1)));
        breaker.record_failure();
        assert_eq!(breaker.allow(), Admission::Admit); // -> half_open, 1 probe used
        assert_eq!(breaker.allow(), Admission::Deny);
    }
}
