//! Round advancement: detect a finished round and build the next one.

use super::{
    errors::{BracketError, BracketResult},
    factory::create_round,
    load_tournament,
    models::{AdvanceResult, ParticipantId, Round, TournamentId},
};
use crate::db::{BracketStore, MatchFilter, MatchRepository};
use chrono::{DateTime, Utc};
use log::{debug, info};

/// Check whether every match of `round` is completed and, if so, generate
/// the next round from its winners.
///
/// Callers must hold the tournament's lock (see
/// [`TournamentLocks`](super::locks::TournamentLocks)) so two completions
/// of the same round cannot both generate a successor.
///
/// # Errors
///
/// * `BracketError::NotFound` - Tournament does not exist
/// * `BracketError::InvalidState` - Round has no matches, or its successor already exists
pub async fn try_advance(
    store: &dyn BracketStore,
    tournament_id: TournamentId,
    round: Round,
    task: &str,
    scheduled_at: DateTime<Utc>,
) -> BracketResult<AdvanceResult> {
    let tournament = load_tournament(store, tournament_id).await?;

    let matches = store
        .find_matches(&MatchFilter::in_rounds(&tournament).with_depth(round.depth))
        .await?;

    if matches.is_empty() {
        return Err(BracketError::InvalidState(format!(
            "tournament {tournament_id} has no {} matches",
            round.label()
        )));
    }

    let total = matches.len();
    let completed = matches.iter().filter(|m| m.is_completed()).count();
    if completed < total {
        debug!(
            "Tournament {}: {} has {}/{} matches completed",
            tournament_id,
            round.label(),
            completed,
            total
        );
        return Ok(AdvanceResult::Pending { completed, total });
    }

    let winners: Vec<ParticipantId> = matches.iter().filter_map(|m| m.winner).collect();

    if let &[champion] = winners.as_slice() {
        info!(
            "Tournament {}: bracket decided, champion {}",
            tournament_id, champion
        );
        return Ok(AdvanceResult::TournamentComplete { champion });
    }

    let next = Round::for_entrants(winners.len());
    let existing = store
        .find_matches(&MatchFilter::in_rounds(&tournament).with_depth(next.depth))
        .await?;
    if !existing.is_empty() {
        return Err(BracketError::InvalidState(format!(
            "{} of tournament {tournament_id} was already generated",
            next.label()
        )));
    }

    let matches = create_round(store, tournament_id, &winners, next, task, scheduled_at).await?;

    Ok(AdvanceResult::NextRound {
        round: next.label(),
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{
        models::{Match, MatchStatus, NewTournament},
        state_machine::record_result,
    };
    use crate::db::{MemoryStore, TournamentRepository};

    async fn bracket(entrants: &[ParticipantId]) -> (MemoryStore, TournamentId) {
        let store = MemoryStore::new();
        let t = store
            .create_tournament(&NewTournament::new("Advance", entrants.len(), 1000))
            .await
            .unwrap();
        create_round(
            &store,
            t.id,
            entrants,
            Round::for_entrants(entrants.len()),
            "",
            Utc::now(),
        )
        .await
        .unwrap();
        (store, t.id)
    }

    async fn round_matches(store: &MemoryStore, id: TournamentId, round: Round) -> Vec<Match> {
        let t = store.find_tournament(id).await.unwrap().unwrap();
        store
            .find_matches(&MatchFilter::in_rounds(&t).with_depth(round.depth))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_incomplete_round_is_pending() {
        let (store, id) = bracket(&[1, 2, 3, 4]).await;
        let matches = round_matches(&store, id, Round::SEMIFINAL).await;
        record_result(&store, matches[0].id, 1).await.unwrap();

        let result = try_advance(&store, id, Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap();
        assert_eq!(result, AdvanceResult::Pending { completed: 1, total: 2 });
        assert!(round_matches(&store, id, Round::FINAL).await.is_empty());
    }

    #[tokio::test]
    async fn test_complete_round_builds_next() {
        let (store, id) = bracket(&[1, 2, 3, 4]).await;
        let matches = round_matches(&store, id, Round::SEMIFINAL).await;
        record_result(&store, matches[0].id, 2).await.unwrap();
        record_result(&store, matches[1].id, 3).await.unwrap();

        let result = try_advance(&store, id, Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap();
        let AdvanceResult::NextRound { round, matches } = result else {
            panic!("expected next round, got {result:?}");
        };
        assert_eq!(round, "Final");
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].slot_a, matches[0].slot_b), (2, Some(3)));
        assert_eq!(matches[0].status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_bye_winner_advances_in_creation_order() {
        let (store, id) = bracket(&[1, 2, 3]).await;
        let matches = round_matches(&store, id, Round::SEMIFINAL).await;
        record_result(&store, matches[0].id, 1).await.unwrap();

        let result = try_advance(&store, id, Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap();
        let AdvanceResult::NextRound { matches, .. } = result else {
            panic!("expected next round");
        };
        assert_eq!((matches[0].slot_a, matches[0].slot_b), (1, Some(3)));
    }

    #[tokio::test]
    async fn test_final_decided_completes_tournament() {
        let (store, id) = bracket(&[5, 6]).await;
        let matches = round_matches(&store, id, Round::FINAL).await;
        record_result(&store, matches[0].id, 6).await.unwrap();

        let result = try_advance(&store, id, Round::FINAL, "", Utc::now())
            .await
            .unwrap();
        assert_eq!(result, AdvanceResult::TournamentComplete { champion: 6 });
    }

    #[tokio::test]
    async fn test_next_round_not_generated_twice() {
        let (store, id) = bracket(&[1, 2, 3, 4]).await;
        let matches = round_matches(&store, id, Round::SEMIFINAL).await;
        record_result(&store, matches[0].id, 1).await.unwrap();
        record_result(&store, matches[1].id, 4).await.unwrap();

        try_advance(&store, id, Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap();
        let err = try_advance(&store, id, Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::InvalidState(_)));
        assert_eq!(round_matches(&store, id, Round::FINAL).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_round_is_invalid() {
        let (store, id) = bracket(&[1, 2]).await;
        let err = try_advance(&store, id, Round::QUARTERFINAL, "", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::InvalidState(_)));
    }
}
