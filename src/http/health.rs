//! Health endpoints.
//!
//! All handlers read already-computed state. None of them touches the
//! database unless the availability flag says it is reachable.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::AvailabilityState;
use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ping", get(ping))
        .route("/health/detailed", get(detailed))
        .route("/health/database", get(database))
        .route("/health/metrics", get(metrics))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: AvailabilityState,
    timestamp: DateTime<Utc>,
}

fn status_code(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn ping() -> &'static str {
    "pong"
}

async fn health(State(state): State<AppState>) -> Response {
    let status = state.health.status();
    let body = StatusBody {
        status,
        timestamp: Utc::now(),
    };
    (status_code(status.is_ready()), Json(body)).into_response()
}

async fn detailed(State(state): State<AppState>) -> Response {
    let report = state.health.report().await;
    let code = status_code(report.status == AvailabilityState::Up);
    (code, Json(report)).into_response()
}

async fn database(State(state): State<AppState>) -> Response {
    let info = state.health.database().await;
    (status_code(info.is_up()), Json(info)).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    Json(state.health.metrics_report()).into_response()
}

async fn ready(State(state): State<AppState>) -> StatusCode {
    let ready = state.health.is_ready();
    if !ready {
        tracing::debug!(status = %state.health.status(), "Readiness check failed");
    }
    status_code(ready)
}

async fn live() -> StatusCode {
    StatusCode::OK
}
