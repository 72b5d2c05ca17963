//! Prometheus metrics for the bracket server.
//!
//! Metrics are exposed in Prometheus text format at `http://<METRICS_BIND>/metrics`
//! when a metrics address is configured. Without an installed recorder every
//! call here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration by route and status
//! - **Bracket Metrics**: Brackets created, results recorded, rounds generated,
//!   tournaments finished

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment brackets created counter.
pub fn brackets_created_total() {
    metrics::counter!("brackets_created_total").increment(1);
}

/// Increment match results recorded counter.
pub fn matches_recorded_total() {
    metrics::counter!("matches_recorded_total").increment(1);
}

/// Increment rounds generated counter, labelled with the round name.
pub fn rounds_generated_total(round: &str) {
    metrics::counter!("rounds_generated_total", "round" => round.to_string()).increment(1);
}

/// Increment tournaments finished counter.
pub fn tournaments_finished_total() {
    metrics::counter!("tournaments_finished_total").increment(1);
}

/// Record points distributed by a finished tournament.
pub fn points_distributed(points: i64) {
    metrics::histogram!("points_distributed").record(points as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        brackets_created_total();
        matches_recorded_total();
        rounds_generated_total("Semifinal");
        tournaments_finished_total();
        points_distributed(850);
    }
}
