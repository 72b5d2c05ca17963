//! Tournament API handlers.
//!
//! This module provides HTTP REST endpoints for tournament operations including:
//! - Creating and listing tournaments
//! - Registering and removing participants
//! - Creating the bracket and viewing it round by round
//! - Finishing a tournament and reading its rewards
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Olympiad", "scheduled_at": "2026-03-01T09:00:00Z", "size": 8, "pi_points": 1000}'
//! ```
//!
//! Create the bracket once the field is full:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/bracket
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use olympiad::bracket::{
    AdvanceResult, BracketCreated, BracketView, NewTournament, ParticipantId, RewardRecord,
    StatusUpdate, Tournament, TournamentId, TournamentStatus,
};
use serde::Deserialize;
use std::time::Instant;

use super::{
    AppState,
    error::{ApiError, ApiResult},
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct ListTournamentsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub participant_id: ParticipantId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

fn parse_status(value: &str) -> ApiResult<TournamentStatus> {
    TournamentStatus::parse(value)
        .ok_or_else(|| ApiError::invalid_input(format!("unknown tournament status '{value}'")))
}

/// Create a tournament.
///
/// # Response
///
/// Returns `201 Created` with the tournament in the `OPENING` state.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Empty name, size below 2 or negative budget
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(request): Json<NewTournament>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    let tournament = state.engine.create_tournament(request).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// List tournaments, newest first, optionally filtered by `?status=`.
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListTournamentsQuery>,
) -> ApiResult<Json<Vec<Tournament>>> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    Ok(Json(state.engine.list_tournaments(status).await?))
}

/// Get a tournament.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.engine.get_tournament(tournament_id).await?))
}

/// Register a participant.
///
/// # Request Body
///
/// ```json
/// { "participant_id": 42 }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
/// - `409 Conflict`: Registration closed, duplicate participant or tournament full
pub async fn register_participant(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<Tournament>> {
    let tournament = state
        .engine
        .register_participant(tournament_id, request.participant_id)
        .await?;
    Ok(Json(tournament))
}

/// Remove a participant before the bracket exists.
pub async fn unregister_participant(
    State(state): State<AppState>,
    Path((tournament_id, participant)): Path<(TournamentId, ParticipantId)>,
) -> ApiResult<Json<Tournament>> {
    let tournament = state
        .engine
        .unregister_participant(tournament_id, participant)
        .await?;
    Ok(Json(tournament))
}

/// Seed the participants and create the first round.
///
/// # Response
///
/// Returns `201 Created`:
/// ```json
/// { "tournament_id": 1, "round": "Quarterfinal", "matches_created": 3, "matches": [...] }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Not opening, bracket already created, or field not full
pub async fn create_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<(StatusCode, Json<BracketCreated>)> {
    let started = Instant::now();
    let created = state.engine.create_bracket(tournament_id).await?;

    metrics::brackets_created_total();
    logging::log_operation(
        "create_bracket",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Get the bracket grouped by round, first round first.
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<BracketView>> {
    Ok(Json(state.engine.get_bracket(tournament_id).await?))
}

/// Advance the bracket from its latest round.
///
/// Repeatable: returns `pending` while the round is in play, generates the
/// next round once, and reports the champion after the Final.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
/// - `409 Conflict`: Tournament not ongoing
pub async fn advance_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<AdvanceResult>> {
    let started = Instant::now();
    let advancement = state.engine.advance(tournament_id).await?;

    if let AdvanceResult::NextRound { round, .. } = &advancement {
        metrics::rounds_generated_total(round);
    }
    logging::log_operation(
        "advance_bracket",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );

    Ok(Json(advancement))
}

/// Resolve placements and distribute the point budget.
///
/// # Errors
///
/// - `409 Conflict`: Final not decided, or rewards already distributed
pub async fn finish_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<RewardRecord>> {
    let started = Instant::now();
    let record = state.engine.finish_tournament(tournament_id).await?;

    metrics::tournaments_finished_total();
    metrics::points_distributed(record.total_points());
    logging::log_operation(
        "finish_tournament",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );

    Ok(Json(record))
}

/// Move a tournament forward in its lifecycle.
///
/// # Request Body
///
/// ```json
/// { "status": "finished" }
/// ```
///
/// # Response
///
/// Returns `200 OK` with the tournament, the reward record when one exists,
/// and a `warning` when the status changed without distributing rewards.
///
/// # Errors
///
/// - `409 Conflict`: Backward or skipped transition, or bracket creation refused
/// - `422 Unprocessable Entity`: Unknown status
pub async fn update_status(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<StatusUpdate>> {
    let started = Instant::now();
    let status = parse_status(&request.status)?;
    let update = state.engine.update_status(tournament_id, status).await?;

    if let Some(warning) = &update.warning {
        tracing::warn!(tournament_id = tournament_id, "Status update: {}", warning);
    }
    record_status_change(status, &update);
    logging::log_operation(
        "update_status",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );

    Ok(Json(update))
}

/// Count the side effect a status change performed, as the dedicated endpoints do
fn record_status_change(status: TournamentStatus, update: &StatusUpdate) {
    if update.warning.is_some() {
        return;
    }
    match (status, &update.rewards) {
        (TournamentStatus::Ongoing, _) => metrics::brackets_created_total(),
        (TournamentStatus::Finished, Some(record)) => {
            metrics::tournaments_finished_total();
            metrics::points_distributed(record.total_points());
        }
        _ => {}
    }
}

/// Get the reward record of a finished tournament.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist or has no reward record
pub async fn get_rewards(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<RewardRecord>> {
    Ok(Json(state.engine.get_rewards(tournament_id).await?))
}
