//! Active health checking.
//!
//! # Responsibilities
//! - One task per route: every `interval_secs` (and once immediately
//!   at construction) concurrently probe each backend at `GET
//!   <url><path>`, 3 s per-probe timeout, no redirects
//! - Any transport error or status >= 500 marks the backend not
//!   alive; a successful probe marks it alive and logs recovery
//!
//! # Design Decisions
//! - Dedicated `reqwest::Client` per monitor, not the proxy's
//!   connection pool
//! - Backend set is swapped via `ArcSwap` so `update()` never blocks
//!   or restarts the ticking task
//! - The dispatcher is never blocked by health-checker I/O

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use crate::config::schema::HealthCheckConfig;
use crate::health::state;
use crate::load_balancer::backend::Backend;

pub struct HealthMonitor {
    route: String,
    backends: ArcSwap<Vec<Arc<Backend>>>,
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(route: impl Into<String>, backends: Vec<Arc<Backend>>, config: HealthCheckConfig) -> Arc<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("reqwest client builds with static config");

        Arc::new(Self {
            route: route.into(),
            backends: ArcSwap::from_pointee(backends),
            config,
            client,
        })
    }

    /// Swap the backend set probed on the next tick. Never restarts
    /// the task.
    pub fn update(&self, backends: Vec<Arc<Backend>>) {
        self.backends.store(Arc::new(backends));
    }

    /// Probe every backend once.
    pub async fn probe_once(&self) {
        let backends = self.backends.load_full();
        let probes = backends.iter().map(|backend| self.probe_one(backend));
        futures_util::future::join_all(probes).await;
    }

    async fn probe_one(&self, backend: &Arc<Backend>) {
        let url = format!("{}{}", backend.url, self.config.path);
        let alive = match self.client.get(&url).send().await {
            Ok(response) => response.status().as_u16() < 500,
            Err(_) => false,
        };
        state::set_alive(backend, alive, &self.route);
    }

    /// Run the periodic probe loop until `shutdown` fires. Probes
    /// immediately, then every `interval_secs`.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            return;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => self.probe_once().await,
                _ = shutdown.recv() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HealthCheckConfig {
        HealthCheckConfig {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 3,
            path: "/health".to_string(),
        }
    }

    #[tokio::test]
    async fn probe_marks_unreachable_backend_not_alive() {
        let backend = Backend::new("http://127.0.0.1:1", 1);
        let monitor = HealthMonitor::new("test", vec![backend.clone()], config());
        monitor.probe_once().await;
        assert!(!backend.is_alive());
    }

    #[test]
    fn update_replaces_backend_set() {
        let a = Backend::new("http://a", 1);
        let monitor = HealthMonitor::new("test", vec![a.clone()], config());
        let b = Backend::new("http://b", 1);
        monitor.update(vec![b.clone()]);
        assert_eq!(monitor.backends.load().len(), 1);
        assert_eq!(monitor.backends.load()[0].url, "http://b");
    }
}
