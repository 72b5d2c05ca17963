//! Placement resolution: rank participants by how far they advanced.

use super::{
    errors::{BracketError, BracketResult},
    load_tournament,
    models::{Match, Placement, Round, TournamentId},
};
use crate::db::{BracketStore, MatchFilter, MatchRepository};

/// Deepest round whose losers still receive a place (Quarterfinal, places 5-8).
pub const DEEPEST_PLACED_ROUND: Round = Round::QUARTERFINAL;

/// Resolve the placements of a tournament whose Final has been decided.
///
/// Reads persisted matches only.
///
/// # Errors
///
/// * `BracketError::NotFound` - Tournament does not exist
/// * `BracketError::IncompleteTournament` - Final missing or undecided
pub async fn resolve_placements(
    store: &dyn BracketStore,
    tournament_id: TournamentId,
) -> BracketResult<Vec<Placement>> {
    let tournament = load_tournament(store, tournament_id).await?;
    let matches = store
        .find_matches(&MatchFilter::in_rounds(&tournament))
        .await?;

    placements_from_matches(tournament_id, &matches)
}

/// Derive placements from a tournament's matches, given in creation order.
///
/// The Final's winner is 1st and its loser 2nd. Losers of the round at depth
/// `d` are placed from `2^d + 1` upwards in the order their matches were
/// created; byes have no loser and take no place. Rounds deeper than the
/// Quarterfinal are not placed.
pub fn placements_from_matches(
    tournament_id: TournamentId,
    matches: &[Match],
) -> BracketResult<Vec<Placement>> {
    let decided_final = matches
        .iter()
        .filter(|m| m.depth == Round::FINAL.depth && m.is_completed())
        .find_map(|m| m.winner.zip(m.loser));

    let Some((champion, runner_up)) = decided_final else {
        return Err(BracketError::IncompleteTournament(tournament_id));
    };

    let mut placements = vec![
        Placement {
            participant: champion,
            place: 1,
        },
        Placement {
            participant: runner_up,
            place: 2,
        },
    ];

    for depth in Round::SEMIFINAL.depth..=DEEPEST_PLACED_ROUND.depth {
        let mut place = (1u32 << depth) + 1;
        for loser in matches
            .iter()
            .filter(|m| m.depth == depth && m.is_completed())
            .filter_map(|m| m.loser)
        {
            placements.push(Placement {
                participant: loser,
                place,
            });
            place += 1;
        }
    }

    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchStatus, ParticipantId};
    use chrono::Utc;

    fn played(id: i64, depth: u32, winner: ParticipantId, loser: Option<ParticipantId>) -> Match {
        Match {
            id,
            tournament_id: 1,
            depth,
            round: Round::new(depth).label(),
            task: String::new(),
            scheduled_at: Utc::now(),
            slot_a: winner,
            slot_b: loser,
            winner: Some(winner),
            loser,
            status: MatchStatus::Completed,
            created_at: Utc::now(),
        }
    }

    fn places(placements: &[Placement]) -> Vec<(ParticipantId, u32)> {
        placements.iter().map(|p| (p.participant, p.place)).collect()
    }

    #[test]
    fn test_eight_player_bracket() {
        let matches = vec![
            played(1, 2, 1, Some(2)),
            played(2, 2, 3, Some(4)),
            played(3, 2, 5, Some(6)),
            played(4, 2, 7, Some(8)),
            played(5, 1, 1, Some(3)),
            played(6, 1, 7, Some(5)),
            played(7, 0, 7, Some(1)),
        ];

        let placements = placements_from_matches(1, &matches).unwrap();
        assert_eq!(
            places(&placements),
            vec![(7, 1), (1, 2), (3, 3), (5, 4), (2, 5), (4, 6), (6, 7), (8, 8)]
        );
    }

    #[test]
    fn test_five_player_bracket_with_byes() {
        // [A vs B] [C vs D] [E bye] -> [A vs D] [E bye] -> [A vs E]
        let (a, b, c, d, e) = (1, 2, 3, 4, 5);
        let matches = vec![
            played(1, 2, a, Some(b)),
            played(2, 2, d, Some(c)),
            played(3, 2, e, None),
            played(4, 1, a, Some(d)),
            played(5, 1, e, None),
            played(6, 0, a, Some(e)),
        ];

        let placements = placements_from_matches(1, &matches).unwrap();
        assert_eq!(
            places(&placements),
            vec![(a, 1), (e, 2), (d, 3), (b, 5), (c, 6)]
        );
    }

    #[test]
    fn test_round_of_16_losers_not_placed() {
        let mut matches: Vec<Match> = (0..8)
            .map(|i| played(i + 1, 3, 100 + i, Some(200 + i)))
            .collect();
        matches.push(played(20, 0, 100, Some(101)));

        let placements = placements_from_matches(1, &matches).unwrap();
        assert_eq!(placements.len(), 2);
        assert!(placements.iter().all(|p| p.place <= 2));
    }

    #[test]
    fn test_first_and_second_assigned_once() {
        let matches = vec![
            played(1, 1, 1, Some(2)),
            played(2, 1, 3, Some(4)),
            played(3, 0, 1, Some(3)),
        ];
        let placements = placements_from_matches(1, &matches).unwrap();
        assert_eq!(placements.iter().filter(|p| p.place == 1).count(), 1);
        assert_eq!(placements.iter().filter(|p| p.place == 2).count(), 1);
        assert_eq!((placements[0].place, placements[1].place), (1, 2));
    }

    #[test]
    fn test_undecided_final_is_incomplete() {
        let mut final_match = played(3, 0, 1, Some(2));
        final_match.status = MatchStatus::Pending;
        final_match.winner = None;
        final_match.loser = None;

        let err = placements_from_matches(9, &[final_match]).unwrap_err();
        assert!(matches!(err, BracketError::IncompleteTournament(9)));
    }

    #[test]
    fn test_missing_final_is_incomplete() {
        let matches = vec![played(1, 1, 1, Some(2))];
        let err = placements_from_matches(4, &matches).unwrap_err();
        assert!(matches!(err, BracketError::IncompleteTournament(4)));
    }
}
