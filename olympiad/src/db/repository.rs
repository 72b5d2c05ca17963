//! Repository trait definitions for testability and dependency injection.
//!
//! The bracket engine only needs `find`, `find_by_id`, `create` and upsert
//! `save` operations on tournaments, matches and reward records, plus two
//! compound writes (`append_round`, `create_reward`) that must land whole. Two
//! implementations exist: [`PgBracketStore`](super::PgBracketStore) for
//! PostgreSQL and [`MemoryStore`](super::MemoryStore) for tests and
//! single-process deployments.

use async_trait::async_trait;

use crate::bracket::{
    BracketResult,
    models::{
        Match, MatchId, NewMatch, NewTournament, RewardEntry, RewardRecord, Tournament,
        TournamentId, TournamentStatus,
    },
};

/// Filter for tournament queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentFilter {
    pub status: Option<TournamentStatus>,
}

impl TournamentFilter {
    pub fn matches(&self, tournament: &Tournament) -> bool {
        self.status.is_none_or(|s| tournament.status == s)
    }
}

/// Filter for match queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub tournament_id: Option<TournamentId>,
    pub ids: Option<Vec<MatchId>>,
    pub depth: Option<u32>,
}

impl MatchFilter {
    /// All matches referenced by a tournament's `rounds` list
    pub fn in_rounds(tournament: &Tournament) -> Self {
        Self {
            tournament_id: Some(tournament.id),
            ids: Some(tournament.rounds.clone()),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn matches(&self, m: &Match) -> bool {
        self.tournament_id.is_none_or(|id| m.tournament_id == id)
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&m.id))
            && self.depth.is_none_or(|d| m.depth == d)
    }
}

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a new tournament in the `Opening` state
    async fn create_tournament(&self, new: &NewTournament) -> BracketResult<Tournament>;

    /// Find tournament by ID
    async fn find_tournament(&self, id: TournamentId) -> BracketResult<Option<Tournament>>;

    /// Find tournaments, newest first
    async fn find_tournaments(&self, filter: &TournamentFilter) -> BracketResult<Vec<Tournament>>;

    /// Insert or replace a tournament
    async fn save_tournament(&self, tournament: &Tournament) -> BracketResult<Tournament>;
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Create the matches of a round and append their ids to the tournament's
    /// `rounds`, in one write. Byes are stored already completed, and an
    /// `Opening` tournament becomes `Ongoing`.
    ///
    /// Either every match is stored and listed, or nothing changes.
    async fn append_round(
        &self,
        tournament_id: TournamentId,
        matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>>;

    /// Find match by ID
    async fn find_match(&self, id: MatchId) -> BracketResult<Option<Match>>;

    /// Find matches in creation order
    async fn find_matches(&self, filter: &MatchFilter) -> BracketResult<Vec<Match>>;

    /// Insert or replace a match
    async fn save_match(&self, m: &Match) -> BracketResult<Match>;
}

/// Trait for reward record repository operations
#[async_trait]
pub trait RewardRepository: Send + Sync {
    /// Create the reward record of a tournament, push its id onto the
    /// tournament's `pi_wards` and mark it `Finished`, in one write
    async fn create_reward(
        &self,
        tournament_id: TournamentId,
        entries: &[RewardEntry],
    ) -> BracketResult<RewardRecord>;

    /// Find the reward record of a tournament
    async fn find_reward_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<RewardRecord>>;
}

/// Everything the bracket engine reads and writes
pub trait BracketStore: TournamentRepository + MatchRepository + RewardRepository {}

impl<T> BracketStore for T where T: TournamentRepository + MatchRepository + RewardRepository {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchStatus, Round};
    use chrono::Utc;

    fn sample_match(id: MatchId, depth: u32, status: MatchStatus) -> Match {
        Match {
            id,
            tournament_id: 1,
            depth,
            round: Round::new(depth).label(),
            task: String::new(),
            scheduled_at: Utc::now(),
            slot_a: 1,
            slot_b: Some(2),
            winner: None,
            loser: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_match_filter_defaults_match_all() {
        let filter = MatchFilter::default();
        assert!(filter.matches(&sample_match(1, 0, MatchStatus::Pending)));
        assert!(filter.matches(&sample_match(2, 3, MatchStatus::Completed)));
    }

    #[test]
    fn test_match_filter_combines_fields() {
        let filter = MatchFilter {
            tournament_id: Some(1),
            ids: Some(vec![1, 2]),
            ..Default::default()
        }
        .with_depth(1);

        assert!(filter.matches(&sample_match(1, 1, MatchStatus::Completed)));
        assert!(filter.matches(&sample_match(2, 1, MatchStatus::Pending)));
        assert!(!filter.matches(&sample_match(2, 0, MatchStatus::Completed)));
        assert!(!filter.matches(&sample_match(3, 1, MatchStatus::Completed)));
    }
}
