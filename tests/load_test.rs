//! Load testing for the reverse proxy.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use reverse_proxy::config::{ProxyConfig, RouteBackendConfig, RouteConfig};
use reverse_proxy::http::HttpServer;
use tokio::sync::{broadcast, watch};

mod common;

#[tokio::test]
async fn test_load_performance() {
    let backend_addr: SocketAddr = "127.0.0.1:28081".parse().unwrap();
    common::start_mock_backend(backend_addr, "Hello from backend").await;

    let proxy_addr: SocketAddr = "127.0.0.1:28082".parse().unwrap();
    let mut config = ProxyConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.admin.enabled = false;
    config.health_check.enabled = false;
    config.routes.push(RouteConfig {
        name: "r1".into(),
        path_prefix: "/".into(),
        backends: vec![RouteBackendConfig { url: format!("http://{backend_addr}"), weight: 1 }],
        lb_algorithm: Default::default(),
        timeout_seconds: 30,
        strip_prefix: false,
        rate_limit: None,
        circuit_breaker: None,
    });

    let (_config_tx, config_updates) = watch::channel(None);
    let (shutdown_tx, server_shutdown) = broadcast::channel(1);
    let metrics_handle = reverse_proxy_metrics_handle();
    let server = HttpServer::new(config);
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown, metrics_handle).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;

    let concurrency = 20;
    let requests_per_task = 50;
    let total_requests = concurrency * requests_per_task;

    let client = reqwest::Client::new();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{proxy_addr}");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert!(!all_latencies.is_empty(), "no successful requests recorded");
    assert!(
        all_latencies.len() as f64 > total_requests as f64 * 0.95,
        "success rate too low: {}/{total_requests}",
        all_latencies.len()
    );

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p99 = all_latencies[((all_latencies.len() as f64 * 0.99) as usize).min(all_latencies.len() - 1)];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {total_requests}");
    println!("Concurrency:    {concurrency}");
    println!("Total Duration: {duration:?}");
    println!("Requests/sec:   {rps:.2}");
    println!("P50 Latency:    {p50:?}");
    println!("P99 Latency:    {p99:?}");
    println!("Success Rate:   {}/{total_requests}", all_latencies.len());
    println!("-------------------------\n");

    let _ = shutdown_tx.send(());
}

fn reverse_proxy_metrics_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle()
}
