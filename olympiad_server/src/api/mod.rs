//! HTTP API for the bracket server.
//!
//! # Modules
//!
//! - [`tournaments`]: Tournament lifecycle (create, register, bracket, advance, finish, status)
//! - [`matches`]: Match lookup and result recording
//! - [`error`]: Bracket error to HTTP status mapping
//! - [`middleware`]: Request metrics
//! - [`request_id`]: Request correlation ids
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use olympiad::{BracketConfig, BracketEngine, MemoryStore};
//! use olympiad_server::api::{AppState, create_router};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let engine = BracketEngine::new(Arc::new(MemoryStore::new()), BracketConfig::default());
//! let state = AppState {
//!     engine: Arc::new(engine),
//!     database: None,
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod error;
pub mod matches;
pub mod middleware;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use olympiad::{BracketEngine, Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BracketEngine>,
    /// Database pool, `None` when running on the in-memory store
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health
/// POST   /api/v1/tournaments
/// GET    /api/v1/tournaments?status=
/// GET    /api/v1/tournaments/{tournament_id}
/// POST   /api/v1/tournaments/{tournament_id}/participants
/// DELETE /api/v1/tournaments/{tournament_id}/participants/{participant_id}
/// POST   /api/v1/tournaments/{tournament_id}/bracket
/// GET    /api/v1/tournaments/{tournament_id}/bracket
/// POST   /api/v1/tournaments/{tournament_id}/finish
/// PUT    /api/v1/tournaments/{tournament_id}/status
/// GET    /api/v1/tournaments/{tournament_id}/rewards
/// GET    /api/v1/matches/{match_id}
/// POST   /api/v1/matches/{match_id}/result
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            post(tournaments::create_tournament).get(tournaments::list_tournaments),
        )
        .route("/tournaments/{tournament_id}", get(tournaments::get_tournament))
        .route(
            "/tournaments/{tournament_id}/participants",
            post(tournaments::register_participant),
        )
        .route(
            "/tournaments/{tournament_id}/participants/{participant_id}",
            delete(tournaments::unregister_participant),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            post(tournaments::create_bracket).get(tournaments::get_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/advance",
            post(tournaments::advance_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/finish",
            post(tournaments::finish_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/status",
            put(tournaments::update_status),
        )
        .route(
            "/tournaments/{tournament_id}/rewards",
            get(tournaments::get_rewards),
        );

    let match_routes = Router::new()
        .route("/matches/{match_id}", get(matches::get_match))
        .route("/matches/{match_id}/result", post(matches::record_result));

    Router::new().merge(tournament_routes).merge(match_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":"postgres","database":true,"timestamp":"2026-03-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
