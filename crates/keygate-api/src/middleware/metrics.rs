//! Metrics tracking middleware
//!
//! Tracks request latency, counts, status codes and login outcomes for
//! Prometheus metrics
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

const LOGIN_PATH: &str = "/users/auth";

/// Metrics tracking middleware
///
/// Records:
/// - Request count per method, endpoint and status
/// - Request latency distribution
/// - Login attempts by outcome
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    // Normalize the path for metrics (remove IDs)
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    let status = response.status();
    state.metrics.observe_request(
        method.as_str(),
        &endpoint,
        status.as_u16(),
        start.elapsed().as_secs_f64(),
    );

    if method == Method::POST && endpoint == LOGIN_PATH {
        state
            .metrics
            .record_auth_attempt(status == StatusCode::CREATED);
    }

    response
}

/// Normalize endpoint paths for consistent metrics
///
/// Replaces numeric ID segments with `:id` to group similar endpoints
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| if is_numeric(seg) { ":id" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a string is numeric (likely an ID)
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
