//! Request-dispatch core: match → limit → pick → break → forward →
//! observe. This is the orchestration the rest of the crate's state
//! machines exist to serve.
//!
//! # Design Decisions
//! - The route table lives behind an `ArcSwap`; a dispatch loads one
//!   snapshot at the top and runs the whole request against it, so a
//!   concurrent reload never produces a half-matched request (§4.6)
//! - Each route's active health-checker task is supervised here, not
//!   in `routing::router`: the router only builds data, this module
//!   owns the task lifecycle (spawn on a new prefix, let an unchanged
//!   prefix's task keep running untouched, abort a removed prefix's)

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::schema::ProxyConfig;
use crate::health::active::HealthMonitor;
use crate::health::passive::{self, Outcome};
use crate::load_balancer::backend::InflightGuard;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::Admission;
use crate::resilience::timeouts::with_timeout;
use crate::routing::router::{Route, RouteTable};
use crate::security::{headers, rate_limit};

pub type ProxyClient = Client<HttpConnector, Body>;

/// Per-route-prefix health-checker task plus the monitor it drives.
type HealthTasks = HashMap<String, (JoinHandle<()>, Arc<HealthMonitor>)>;

/// The live gateway: current route table, outbound client, and the
/// set of running health-checker tasks.
pub struct Gateway {
    table: ArcSwap<RouteTable>,
    client: ProxyClient,
    health_tasks: AsyncMutex<HealthTasks>,
    health_shutdown: broadcast::Sender<()>,
}

impl Gateway {
    pub fn new(config: &ProxyConfig) -> Arc<Self> {
        let table = RouteTable::build(config, None);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let (health_shutdown, _rx) = broadcast::channel(1);

        Arc::new(Self {
            table: ArcSwap::from_pointee(table),
            client,
            health_tasks: AsyncMutex::new(HashMap::new()),
            health_shutdown,
        })
    }

    pub fn route_table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Spawn health-checker tasks for the current table. Call once
    /// after construction.
    pub async fn start_health_checkers(self: &Arc<Self>) {
        self.sync_health_tasks().await;
    }

    /// Install `config` as the new route table: reuses backend and
    /// breaker identity for unchanged `(prefix, url)` pairs, then
    /// reconciles health-checker tasks against the new route set.
    pub async fn reload(self: &Arc<Self>, config: &ProxyConfig) {
        let previous = self.table.load_full();
        let next = Arc::new(RouteTable::build(config, Some(&previous)));
        let route_count = next.routes().len();
        self.table.store(next);
        self.sync_health_tasks().await;
        tracing::info!(routes = route_count, "route table reloaded");
    }

    /// Stop every health-checker task. Used at process shutdown.
    pub fn stop_health_checkers(&self) {
        let _ = self.health_shutdown.send(());
    }

    async fn sync_health_tasks(self: &Arc<Self>) {
        let table = self.table.load_full();
        let mut tasks = self.health_tasks.lock().await;
        let mut live = HashSet::new();

        for route in table.routes() {
            live.insert(route.path_prefix.clone());
            let reused = matches!(tasks.get(&route.path_prefix), Some((_, monitor)) if Arc::ptr_eq(monitor, &route.health_monitor));
            if reused {
                continue;
            }

            if let Some((handle, _)) = tasks.remove(&route.path_prefix) {
                handle.abort();
            }
            let monitor = route.health_monitor.clone();
            let handle = tokio::spawn(monitor.clone().run(self.health_shutdown.subscribe()));
            tasks.insert(route.path_prefix.clone(), (handle, monitor));
        }

        let gone: Vec<String> = tasks.keys().filter(|prefix| !live.contains(*prefix)).cloned().collect();
        for prefix in gone {
            if let Some((handle, _)) = tasks.remove(&prefix) {
                handle.abort();
            }
        }
    }

    /// Dispatch one inbound request to completion, per §4.1.
    pub async fn dispatch(self: &Arc<Self>, mut req: Request<Body>, peer: SocketAddr) -> Response<Body> {
        let start = Instant::now();
        metrics::inc_active_connections();
        let response = self.dispatch_inner(&mut req, peer, start).await;
        metrics::dec_active_connections();
        response
    }

    async fn dispatch_inner(self: &Arc<Self>, req: &mut Request<Body>, peer: SocketAddr, start: Instant) -> Response<Body> {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let table = self.table.load_full();
        let Some(route) = table.match_path(&path) else {
            metrics::record_request("none", &method, 404, start.elapsed());
            return with_request_id(not_found(), &request_id);
        };

        if let Some(limiter) = &route.rate_limiter {
            let key = rate_limit::derive_key(limiter.key_by(), req.headers(), peer);
            if let rate_limit::Decision::Deny { retry_after } = limiter.allow(&key).await {
                metrics::record_request(&route.name, &method, 429, start.elapsed());
                return with_request_id(too_many_requests(retry_after), &request_id);
            }
        }

        let client_key = client_ip_key(req.headers(), peer);
        let Some(backend) = route.balancer.next(&route.backends, &client_key) else {
            metrics::record_request(&route.name, &method, 503, start.elapsed());
            return with_request_id(service_unavailable("no healthy backend"), &request_id);
        };

        let breaker = route.breaker(&backend.url);
        if breaker.allow() == Admission::Deny {
            metrics::record_request(&route.name, &method, 503, start.elapsed());
            return with_request_id(service_unavailable("circuit open"), &request_id);
        }

        let _inflight = InflightGuard::new(backend.clone());

        let outbound = match build_outbound_request(req, route, &backend.url, peer, &request_id) {
            Some(outbound) => outbound,
            None => {
                metrics::record_request(&route.name, &method, 502, start.elapsed());
                return with_request_id(bad_gateway(), &request_id);
            }
        };

        let body_was_empty = matches!(req.body().size_hint().exact(), Some(0));

        let mut result = with_timeout(route.timeout, self.client.request(outbound)).await;
        if let Ok(Err(_)) = result {
            // A pooled keep-alive connection can die between the pool's
            // liveness check and actual use (the peer closes it right
            // as we write to it). Bodiless requests are safe to retry
            // once on a fresh connection; requests with a body are not,
            // since the body has already been consumed.
            if body_was_empty {
                if let Some(retry) = build_outbound_request(req, route, &backend.url, peer, &request_id) {
                    result = with_timeout(route.timeout, self.client.request(retry)).await;
                }
            }
        }

        let status = match result {
            Ok(Ok(upstream)) => {
                let status = upstream.status();
                let outcome = if status.as_u16() >= 500 { Outcome::Failure } else { Outcome::Success };
                passive::observe(&backend, breaker, outcome, &route.name);

                metrics::record_request(&route.name, &method, status.as_u16(), start.elapsed());

                let mut response = upstream.map(Body::new);
                headers::strip_hop_by_hop(response.headers_mut());
                response.headers_mut().insert(
                    header::HeaderName::from_static("x-gateway-backend"),
                    HeaderValue::from_str(&backend.url).unwrap_or_else(|_| HeaderValue::from_static("")),
                );
                return with_request_id(response, &request_id);
            }
            Ok(Err(_transport_error)) => {
                passive::observe(&backend, breaker, Outcome::Failure, &route.name);
                502
            }
            Err(_elapsed) => {
                passive::observe(&backend, breaker, Outcome::Failure, &route.name);
                502
            }
        };

        metrics::record_request(&route.name, &method, status, start.elapsed());
        with_request_id(
            Response::builder()
                .status(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
                .body(Body::empty())
                .expect("static status/body always build"),
            &request_id,
        )
    }
}

/// Derive the client-IP key used by `ip_hash`: prefer
/// `X-Forwarded-For`, then `X-Real-IP`, then the socket peer address.
fn client_ip_key(headers: &axum::http::HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}

fn strip_route_prefix(prefix: &str, path: &str) -> String {
    if prefix == "/" || prefix.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(prefix) {
        Some("") => "/".to_string(),
        Some(rest) => rest.to_string(),
        None => path.to_string(),
    }
}

fn build_outbound_request(
    req: &mut Request<Body>,
    route: &Route,
    backend_url: &str,
    peer: SocketAddr,
    request_id: &str,
) -> Option<Request<Body>> {
    let path = req.uri().path();
    let rewritten_path = if route.strip_prefix {
        strip_route_prefix(&route.path_prefix, path)
    } else {
        path.to_string()
    };
    let path_and_query = match req.uri().query() {
        Some(q) => format!("{rewritten_path}?{q}"),
        None => rewritten_path,
    };

    let target = format!("{}{}", backend_url.trim_end_matches('/'), path_and_query);
    let uri: axum::http::Uri = target.parse().ok()?;

    let mut headers = req.headers().clone();
    headers::strip_hop_by_hop(&mut headers);
    let proto = if backend_url.starts_with("https://") { "https" } else { "http" };
    let host = req.headers().get(header::HOST).and_then(|v| v.to_str().ok());
    headers::apply_forwarded_headers(&mut headers, peer.ip(), proto, host);
    headers.insert(
        header::HeaderName::from_static("x-request-id"),
        HeaderValue::from_str(request_id).ok()?,
    );

    let mut builder = Request::builder().method(req.method().clone()).uri(uri).version(req.version());
    *builder.headers_mut()? = headers;

    let body = std::mem::replace(req.body_mut(), Body::empty());
    builder.body(body).ok()
}

fn with_request_id(mut response: Response<Body>, request_id: &str) -> Response<Body> {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(header::HeaderName::from_static("x-request-id"), value);
    }
    response
}

fn not_found() -> Response<Body> {
    Response::builder().status(StatusCode::NOT_FOUND).body(Body::from("no matching route")).unwrap()
}

fn service_unavailable(reason: &str) -> Response<Body> {
    Response::builder().status(StatusCode::SERVICE_UNAVAILABLE).body(Body::from(reason.to_string())).unwrap()
}

fn bad_gateway() -> Response<Body> {
    Response::builder().status(StatusCode::BAD_GATEWAY).body(Body::empty()).unwrap()
}

fn too_many_requests(retry_after: Duration) -> Response<Body> {
    let retry_secs = retry_after.as_secs_f64().round().max(0.0) as u64;
    let reset_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .saturating_add(retry_after)
        .as_secs();

    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(header::RETRY_AFTER, retry_secs)
        .header("x-ratelimit-reset", reset_at)
        .body(Body::empty())
        .unwrap()
}
