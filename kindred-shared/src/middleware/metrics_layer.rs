use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
pub use metrics_exporter_prometheus::PrometheusHandle;

/// Install the global Prometheus recorder. Call once at startup; the handle
/// renders the scrape body for GET /metrics.
pub fn install_prometheus() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus recorder already installed")
}

/// Per-request counter and latency histogram, labeled by the route template
/// rather than the raw path so UUID segments do not explode cardinality.
pub async fn track_http(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = matched_path
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().as_str().to_owned();

    let started = Instant::now();
    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("route", route),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!("kindred_http_requests_total", &labels).increment(1);
    histogram!("kindred_http_request_seconds", &labels).record(started.elapsed().as_secs_f64());

    response
}
