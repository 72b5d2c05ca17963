//! HTTP metrics middleware.
//!
//! Records a request counter and a duration histogram for every request,
//! labelled by the matched route template (`/api/v1/matches/{match_id}/result`)
//! rather than the raw URI so ids do not explode label cardinality.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! use olympiad_server::api::middleware::metrics_middleware;
//! # async fn handler() {}
//!
//! let app: Router = Router::new()
//!     .route("/health", get(handler))
//!     .layer(middleware::from_fn(metrics_middleware));
//! # let _ = app;
//! ```

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics;

/// Label used for requests that matched no route
const UNMATCHED_PATH: &str = "unmatched";

/// Record request count and latency
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    metrics::http_requests_total(&method, &path, response.status().as_u16());
    metrics::http_request_duration_ms(&method, &path, elapsed_ms);

    response
}
