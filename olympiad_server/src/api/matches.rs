//! Match API handlers.
//!
//! Record a result:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/matches/7/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"winner_id": 42}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use olympiad::bracket::{AdvanceResult, Match, MatchId, MatchResultOutcome, ParticipantId};
use serde::Deserialize;
use std::time::Instant;

use super::{AppState, error::ApiResult};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    pub winner_id: ParticipantId,
}

/// Get a match.
///
/// # Errors
///
/// - `404 Not Found`: Match doesn't exist
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<Match>> {
    Ok(Json(state.engine.get_match(match_id).await?))
}

/// Record the winner of a match and advance the bracket.
///
/// # Response
///
/// Returns `200 OK` with the completed match and what happened to its round:
/// ```json
/// {
///   "match": { "id": 7, "status": "COMPLETED", ... },
///   "status": "COMPLETED",
///   "advancement": { "kind": "next_round", "round": "Final", "matches": [...] }
/// }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Match doesn't exist
/// - `409 Conflict`: Match already completed or tournament not ongoing
/// - `422 Unprocessable Entity`: Winner did not play this match
pub async fn record_result(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
    Json(request): Json<RecordResultRequest>,
) -> ApiResult<Json<MatchResultOutcome>> {
    let started = Instant::now();
    let outcome = state
        .engine
        .record_match_result(match_id, request.winner_id)
        .await?;

    metrics::matches_recorded_total();
    if let AdvanceResult::NextRound { round, .. } = &outcome.advancement {
        metrics::rounds_generated_total(round);
    }
    logging::log_operation(
        "record_match_result",
        outcome.recorded.tournament_id,
        started.elapsed().as_millis() as u64,
    );

    Ok(Json(outcome))
}
