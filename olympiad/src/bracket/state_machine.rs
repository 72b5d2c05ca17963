//! Match state machine: pending -> completed, exactly once.

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, MatchId, ParticipantId},
};
use crate::db::{BracketStore, MatchRepository};
use log::info;

/// Record `winner` for a pending match and persist it.
///
/// Round advancement is a separate step; see
/// [`try_advance`](super::advancement::try_advance).
///
/// # Errors
///
/// * `BracketError::NotFound` - Match does not exist
/// * `BracketError::InvalidState` - Match already completed
/// * `BracketError::InvalidWinner` - `winner` is not one of the slots
pub async fn record_result(
    store: &dyn BracketStore,
    match_id: MatchId,
    winner: ParticipantId,
) -> BracketResult<Match> {
    let mut m = store
        .find_match(match_id)
        .await?
        .ok_or_else(|| BracketError::match_not_found(match_id))?;

    m.complete(winner)?;
    let saved = store.save_match(&m).await?;

    info!(
        "Tournament {}: match {} ({}) won by {}",
        saved.tournament_id, saved.id, saved.round, winner
    );

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{
        factory::create_round,
        models::{MatchStatus, NewTournament, Round},
    };
    use crate::db::{MemoryStore, TournamentRepository};
    use chrono::Utc;

    async fn final_match(store: &MemoryStore) -> Match {
        let t = store
            .create_tournament(&NewTournament::new("Final only", 2, 100))
            .await
            .unwrap();
        create_round(store, t.id, &[1, 2], Round::FINAL, "", Utc::now())
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_record_result_persists() {
        let store = MemoryStore::new();
        let m = final_match(&store).await;

        let recorded = record_result(&store, m.id, 2).await.unwrap();
        assert_eq!(recorded.status, MatchStatus::Completed);
        assert_eq!(recorded.winner, Some(2));
        assert_eq!(recorded.loser, Some(1));

        let stored = store.find_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored, recorded);
    }

    #[tokio::test]
    async fn test_second_result_rejected() {
        let store = MemoryStore::new();
        let m = final_match(&store).await;

        record_result(&store, m.id, 1).await.unwrap();
        let err = record_result(&store, m.id, 2).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidState(_)));

        let stored = store.find_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored.winner, Some(1));
    }

    #[tokio::test]
    async fn test_outsider_rejected() {
        let store = MemoryStore::new();
        let m = final_match(&store).await;

        let err = record_result(&store, m.id, 3).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidWinner { participant: 3, .. }));
        let stored = store.find_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_bye_cannot_be_rerecorded() {
        let store = MemoryStore::new();
        let t = store
            .create_tournament(&NewTournament::new("Bye", 3, 100))
            .await
            .unwrap();
        let matches = create_round(&store, t.id, &[1, 2, 3], Round::SEMIFINAL, "", Utc::now())
            .await
            .unwrap();

        let err = record_result(&store, matches[1].id, 3).await.unwrap_err();
        assert!(matches!(err, BracketError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let store = MemoryStore::new();
        let err = record_result(&store, 12, 1).await.unwrap_err();
        assert!(matches!(err, BracketError::NotFound { entity: "Match", id: 12 }));
    }
}
