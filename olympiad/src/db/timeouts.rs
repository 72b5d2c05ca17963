//! Deadlines for store calls.
//!
//! Every bracket step suspends on the datastore; a stuck query must surface
//! as an error to the caller instead of holding the tournament lock forever.

use std::{future::Future, sync::OnceLock, time::Duration};
use tokio::time::timeout;

/// Deadline for a single query unless `DB_QUERY_TIMEOUT_MS` says otherwise
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

static QUERY_TIMEOUT: OnceLock<Duration> = OnceLock::new();

/// Error type for deadline-bound store calls
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for deadline-bound store calls
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Query deadline, read once from `DB_QUERY_TIMEOUT_MS`
pub fn query_timeout() -> Duration {
    *QUERY_TIMEOUT.get_or_init(|| {
        std::env::var("DB_QUERY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT)
    })
}

/// Run `future` with an explicit deadline
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Run `future` with the configured query deadline
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(query_timeout(), future).await
}
