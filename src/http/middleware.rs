//! API call timing.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics::MetricsRecorder;

/// Records every call under its matched route template, so
/// `/api/clients/7` and `/api/clients/8` share `/api/clients/{id}`.
pub async fn track_api_call(
    State(metrics): State<Arc<MetricsRecorder>>,
    matched: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let endpoint = match matched {
        Some(path) => path.as_str().to_string(),
        None => request.uri().path().to_string(),
    };

    let started = Instant::now();
    let response = next.run(request).await;
    metrics.record(&endpoint, started.elapsed());

    tracing::debug!(
        endpoint = %endpoint,
        status = response.status().as_u16(),
        "API call recorded"
    );
    response
}
