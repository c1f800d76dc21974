use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::Deployment;

/// Feed every request's latency into the status page average
pub async fn track_response_time(
    State(deployment): State<Deployment>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    deployment.response_times().record(started.elapsed());
    response
}
