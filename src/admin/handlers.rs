use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::dispatch::Gateway;

#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<Gateway>,
    pub metrics_handle: PrometheusHandle,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub url: String,
    pub alive: bool,
    pub inflight: usize,
    pub circuit_breaker: &'static str,
}

#[derive(Serialize)]
pub struct RouteBackends {
    pub route: String,
    pub backends: Vec<BackendStatus>,
}

#[derive(Serialize)]
pub struct NotReady {
    pub status: &'static str,
    pub reason: &'static str,
}

pub async fn metrics(State(state): State<AdminState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AdminState>) -> impl IntoResponse {
    let table = state.gateway.route_table();
    let ready = table.routes().iter().any(|route| route.backends.iter().any(|b| b.is_alive()));

    if ready {
        StatusCode::OK.into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(NotReady { status: "not_ready", reason: "no healthy backends" }),
        )
            .into_response()
    }
}

pub async fn backends(State(state): State<AdminState>) -> impl IntoResponse {
    let table = state.gateway.route_table();
    let snapshot: Vec<RouteBackends> = table
        .routes()
        .iter()
        .map(|route| RouteBackends {
            route: route.name.clone(),
            backends: route
                .backends
                .iter()
                .map(|b| BackendStatus {
                    url: b.url.clone(),
                    alive: b.is_alive(),
                    inflight: b.inflight(),
                    circuit_breaker: route.breaker(&b.url).state(),
                })
                .collect(),
        })
        .collect();

    Json(snapshot)
}
