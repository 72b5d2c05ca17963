//! Match factory: turns a round's entrants into paired matches.

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, NewMatch, ParticipantId, Round, TournamentId},
};
use crate::db::{BracketStore, MatchRepository};
use chrono::{DateTime, Utc};
use log::{debug, info};

/// Pair `entrants` in input order into matches of `round`.
///
/// A trailing entrant without a partner gets a bye: a match with only
/// `slot_a`, already completed and won by that entrant. The matches and
/// their ids in the tournament's `rounds` list are written together, so a
/// failed write leaves no orphaned match behind. Exactly
/// `ceil(entrants.len() / 2)` matches are produced.
///
/// # Errors
///
/// * `BracketError::NotFound` - Tournament does not exist
/// * `BracketError::InvalidState` - No entrants
pub async fn create_round(
    store: &dyn BracketStore,
    tournament_id: TournamentId,
    entrants: &[ParticipantId],
    round: Round,
    task: &str,
    scheduled_at: DateTime<Utc>,
) -> BracketResult<Vec<Match>> {
    if entrants.is_empty() {
        return Err(BracketError::InvalidState(format!(
            "cannot create {} for tournament {tournament_id} without entrants",
            round.label()
        )));
    }

    let pairs: Vec<NewMatch> = entrants
        .chunks(2)
        .map(|pair| NewMatch {
            round,
            task: task.to_string(),
            scheduled_at,
            slot_a: pair[0],
            slot_b: pair.get(1).copied(),
        })
        .collect();
    let matches = store.append_round(tournament_id, &pairs).await?;

    for bye in matches.iter().filter(|m| m.is_bye()) {
        debug!(
            "Tournament {}: participant {} receives a bye in the {}",
            tournament_id, bye.slot_a, bye.round
        );
    }

    info!(
        "Tournament {}: created {} with {} match(es) for {} entrant(s)",
        tournament_id,
        round.label(),
        matches.len(),
        entrants.len()
    );

    Ok(matches)
}
