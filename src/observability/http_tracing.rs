//! # HTTP Request Tracing Middleware
//!
//! Axum middleware that wraps each request in a tracing span and records
//! Prometheus request metrics.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Instrument;

use super::metrics;

/// Axum middleware that opens an `http_request` span for each request and
/// records latency and status once the response is ready.
pub async fn trace_http_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().path().to_string();
    let start = Instant::now();

    let span = crate::request_span!(method, uri);
    let response = next.run(request).instrument(span.clone()).await;

    let status_code = response.status().as_u16();
    let elapsed = start.elapsed();

    span.in_scope(|| {
        tracing::debug!(
            status_code = status_code,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );
    });

    metrics::record_http_request(
        &method,
        &normalize_path_for_metrics(&uri),
        status_code,
        elapsed.as_secs_f64(),
    )
    .await;

    response
}

/// Replace identifiers after a collection segment with `:id` to keep label
/// cardinality bounded.
fn normalize_path_for_metrics(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            normalized.push(*segment);
            continue;
        }

        let prev_is_collection =
            i > 0 && matches!(segments.get(i - 1).copied(), Some("users") | Some("groups"));

        if prev_is_collection {
            normalized.push(":id");
        } else {
            normalized.push(*segment);
        }
    }

    normalized.join("/")
}
