//! HTTP middleware.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::state::AppState;

/// Feeds every HTTP request's duration and outcome into the network monitor.
pub async fn track_request(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let success = response.status().as_u16() < 400;

    state
        .network_monitor_usecase
        .record_request(elapsed_ms, success)
        .await;
    response
}
