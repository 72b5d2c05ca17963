//! In-process store for tests and single-node deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::repository::{
    MatchFilter, MatchRepository, RewardRepository, TournamentFilter, TournamentRepository,
};
use crate::bracket::{
    BracketError, BracketResult,
    models::{
        Match, MatchId, NewMatch, NewTournament, RewardEntry, RewardRecord, Tournament,
        TournamentId, TournamentStatus,
    },
};

#[derive(Default)]
struct Tables {
    tournaments: BTreeMap<TournamentId, Tournament>,
    matches: BTreeMap<MatchId, Match>,
    rewards: BTreeMap<TournamentId, RewardRecord>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store keeping every document in memory behind an async lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn create_tournament(&self, new: &NewTournament) -> BracketResult<Tournament> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let tournament = Tournament {
            id: tables.allocate_id(),
            name: new.name.clone(),
            description: new.description.clone(),
            scheduled_at: new.scheduled_at,
            size: new.size,
            max_score: new.max_score,
            pi_points: new.pi_points,
            registration_closes_at: new.registration_closes_at,
            topic: new.topic.clone(),
            status: TournamentStatus::Opening,
            participants: Vec::new(),
            rounds: Vec::new(),
            pi_wards: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn find_tournament(&self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        Ok(self.tables.read().await.tournaments.get(&id).cloned())
    }

    async fn find_tournaments(&self, filter: &TournamentFilter) -> BracketResult<Vec<Tournament>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tournaments
            .values()
            .rev()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn save_tournament(&self, tournament: &Tournament) -> BracketResult<Tournament> {
        let mut saved = tournament.clone();
        saved.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        tables.next_id = tables.next_id.max(saved.id);
        tables.tournaments.insert(saved.id, saved.clone());
        Ok(saved)
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn append_round(
        &self,
        tournament_id: TournamentId,
        new_matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>> {
        let mut tables = self.tables.write().await;
        if !tables.tournaments.contains_key(&tournament_id) {
            return Err(BracketError::tournament_not_found(tournament_id));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(new_matches.len());
        for new in new_matches {
            let (status, winner) = new.initial_result();
            created.push(Match {
                id: tables.allocate_id(),
                tournament_id,
                depth: new.round.depth,
                round: new.round.label(),
                task: new.task.clone(),
                scheduled_at: new.scheduled_at,
                slot_a: new.slot_a,
                slot_b: new.slot_b,
                winner,
                loser: None,
                status,
                created_at: now,
            });
        }

        if let Some(tournament) = tables.tournaments.get_mut(&tournament_id) {
            tournament.rounds.extend(created.iter().map(|m| m.id));
            if tournament.status == TournamentStatus::Opening {
                tournament.status = TournamentStatus::Ongoing;
            }
            tournament.updated_at = now;
        }
        for m in &created {
            tables.matches.insert(m.id, m.clone());
        }

        Ok(created)
    }

    async fn find_match(&self, id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.tables.read().await.matches.get(&id).cloned())
    }

    async fn find_matches(&self, filter: &MatchFilter) -> BracketResult<Vec<Match>> {
        let tables = self.tables.read().await;
        Ok(tables
            .matches
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn save_match(&self, m: &Match) -> BracketResult<Match> {
        let mut tables = self.tables.write().await;
        tables.next_id = tables.next_id.max(m.id);
        tables.matches.insert(m.id, m.clone());
        Ok(m.clone())
    }
}

#[async_trait]
impl RewardRepository for MemoryStore {
    async fn create_reward(
        &self,
        tournament_id: TournamentId,
        entries: &[RewardEntry],
    ) -> BracketResult<RewardRecord> {
        let mut tables = self.tables.write().await;
        if tables.rewards.contains_key(&tournament_id) {
            return Err(BracketError::AlreadyDistributed(tournament_id));
        }
        if !tables.tournaments.contains_key(&tournament_id) {
            return Err(BracketError::tournament_not_found(tournament_id));
        }

        let record = RewardRecord {
            id: tables.allocate_id(),
            tournament_id,
            entries: entries.to_vec(),
            created_at: Utc::now(),
        };
        if let Some(tournament) = tables.tournaments.get_mut(&tournament_id) {
            tournament.pi_wards.push(record.id);
            tournament.status = TournamentStatus::Finished;
            tournament.updated_at = record.created_at;
        }
        tables.rewards.insert(tournament_id, record.clone());
        Ok(record)
    }

    async fn find_reward_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<RewardRecord>> {
        Ok(self.tables.read().await.rewards.get(&tournament_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchStatus, Round};

    #[tokio::test]
    async fn test_create_and_find_tournament() {
        let store = MemoryStore::new();
        let created = store
            .create_tournament(&NewTournament::new("Regional", 4, 500))
            .await
            .unwrap();

        assert_eq!(created.status, TournamentStatus::Opening);
        assert!(created.participants.is_empty());

        let found = store.find_tournament(created.id).await.unwrap();
        assert_eq!(found, Some(created));
        assert!(store.find_tournament(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_tournaments_by_status() {
        let store = MemoryStore::new();
        let first = store
            .create_tournament(&NewTournament::new("A", 2, 100))
            .await
            .unwrap();
        let mut second = store
            .create_tournament(&NewTournament::new("B", 2, 100))
            .await
            .unwrap();
        second.status = TournamentStatus::Ongoing;
        store.save_tournament(&second).await.unwrap();

        let all = store
            .find_tournaments(&TournamentFilter::default())
            .await
            .unwrap();
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let opening = store
            .find_tournaments(&TournamentFilter {
                status: Some(TournamentStatus::Opening),
            })
            .await
            .unwrap();
        assert_eq!(opening.len(), 1);
        assert_eq!(opening[0].id, first.id);
    }

    fn new_match(round: Round, slot_a: i64, slot_b: Option<i64>) -> NewMatch {
        NewMatch {
            round,
            task: "Geometry".to_string(),
            scheduled_at: Utc::now(),
            slot_a,
            slot_b,
        }
    }

    #[tokio::test]
    async fn test_append_round_lists_matches_and_starts_tournament() {
        let store = MemoryStore::new();
        let t = store
            .create_tournament(&NewTournament::new("Byes", 3, 100))
            .await
            .unwrap();

        let created = store
            .append_round(
                t.id,
                &[
                    new_match(Round::SEMIFINAL, 1, Some(2)),
                    new_match(Round::SEMIFINAL, 77, None),
                ],
            )
            .await
            .unwrap();

        let bye = &created[1];
        assert_eq!(bye.status, MatchStatus::Completed);
        assert_eq!(bye.winner, Some(77));
        assert_eq!(bye.loser, None);
        assert_eq!(bye.round, "Semifinal");
        assert_eq!(created[0].status, MatchStatus::Pending);

        let t = store.find_tournament(t.id).await.unwrap().unwrap();
        assert_eq!(t.rounds, vec![created[0].id, created[1].id]);
        assert_eq!(t.status, TournamentStatus::Ongoing);
    }

    #[tokio::test]
    async fn test_append_round_unknown_tournament_stores_nothing() {
        let store = MemoryStore::new();
        let err = store
            .append_round(5, &[new_match(Round::FINAL, 1, Some(2))])
            .await
            .unwrap_err();
        assert!(matches!(err, BracketError::NotFound { .. }));
        assert!(
            store
                .find_matches(&MatchFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_reward_created_once() {
        let store = MemoryStore::new();
        let t = store
            .create_tournament(&NewTournament::new("Rewards", 2, 1000))
            .await
            .unwrap();
        let entries = [RewardEntry {
            participant: 1,
            points: 350,
            place: 1,
        }];

        let record = store.create_reward(t.id, &entries).await.unwrap();
        assert_eq!(record.total_points(), 350);

        let finished = store.find_tournament(t.id).await.unwrap().unwrap();
        assert_eq!(finished.pi_wards, vec![record.id]);
        assert_eq!(finished.status, TournamentStatus::Finished);

        let err = store.create_reward(t.id, &entries).await.unwrap_err();
        assert!(matches!(err, BracketError::AlreadyDistributed(id) if id == t.id));
        assert_eq!(
            store.find_reward_by_tournament(t.id).await.unwrap(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_reward_for_unknown_tournament() {
        let store = MemoryStore::new();
        let err = store.create_reward(3, &[]).await.unwrap_err();
        assert!(matches!(err, BracketError::NotFound { id: 3, .. }));
        assert!(store.find_reward_by_tournament(3).await.unwrap().is_none());
    }
}
