use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{debug, warn};

/// Log one line per request: method, path, status and latency.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        warn!(%method, %path, status, elapsed_ms, "request failed");
    } else {
        debug!(%method, %path, status, elapsed_ms, "request handled");
    }

    response
}
