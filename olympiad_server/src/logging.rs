//! Structured logging configuration.
//!
//! The `olympiad` library logs through the `log` facade; those records are
//! bridged into the same `tracing` subscriber as the server's own events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn,tower_http=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use olympiad_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed bracket operation
///
/// Operations slower than one second are logged as warnings.
pub fn log_operation(operation: &str, tournament_id: i64, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            tournament_id = tournament_id,
            duration_ms = duration_ms,
            "Slow bracket operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            tournament_id = tournament_id,
            duration_ms = duration_ms,
            "Bracket operation"
        );
    }
}

/// Log a request that failed with a server-side error
pub fn log_internal_error(operation: &str, error: &dyn std::fmt::Display) {
    tracing::error!(operation = operation, error = %error, "Request failed");
}
