//! Bracket engine: the caller-facing entry point for tournament lifecycles.

use super::{
    advancement::try_advance,
    config::BracketConfig,
    errors::{BracketError, BracketResult},
    factory::create_round,
    load_tournament,
    locks::TournamentLocks,
    models::{
        AdvanceResult, BracketView, Match, MatchId, MatchStatus, NewTournament, ParticipantId,
        RewardRecord, Round, Tournament, TournamentId, TournamentStatus,
    },
    rewards::distribute_rewards,
    seeding::Seeder,
    state_machine::record_result,
};
use crate::db::{
    BracketStore, MatchFilter, MatchRepository, RewardRepository, TournamentFilter,
    TournamentRepository,
};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of creating a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketCreated {
    pub tournament_id: TournamentId,
    pub round: String,
    pub matches_created: usize,
    pub matches: Vec<Match>,
}

/// Result of recording a match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResultOutcome {
    #[serde(rename = "match")]
    pub recorded: Match,
    pub status: MatchStatus,
    pub advancement: AdvanceResult,
}

/// Result of a lifecycle status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub tournament: Tournament,
    pub rewards: Option<RewardRecord>,
    /// Set when the status changed but a side effect (reward distribution) did not happen
    pub warning: Option<String>,
}

/// Bracket engine
///
/// Every mutation of a tournament runs under that tournament's lock.
#[derive(Clone)]
pub struct BracketEngine {
    store: Arc<dyn BracketStore>,
    locks: TournamentLocks,
    seeder: Arc<Mutex<Seeder>>,
    config: BracketConfig,
}

impl BracketEngine {
    /// Create a new bracket engine
    pub fn new(store: Arc<dyn BracketStore>, config: BracketConfig) -> Self {
        let seeder = match config.seed {
            Some(seed) => Seeder::from_seed(seed),
            None => Seeder::new(),
        };

        Self {
            store,
            locks: TournamentLocks::new(),
            seeder: Arc::new(Mutex::new(seeder)),
            config,
        }
    }

    /// Replace the seeder, e.g. with a fixed seed in tests
    pub fn with_seeder(mut self, seeder: Seeder) -> Self {
        self.seeder = Arc::new(Mutex::new(seeder));
        self
    }

    pub fn store(&self) -> &dyn BracketStore {
        self.store.as_ref()
    }

    /// Create a tournament in the `Opening` state
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - Empty name, size below 2 or negative budget
    pub async fn create_tournament(&self, new: NewTournament) -> BracketResult<Tournament> {
        new.validate()?;
        let tournament = self.store.create_tournament(&new).await?;

        info!(
            "Created tournament {} '{}' for {} participants, {} points",
            tournament.id, tournament.name, tournament.size, tournament.pi_points
        );

        Ok(tournament)
    }

    /// Get a tournament
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        load_tournament(self.store(), tournament_id).await
    }

    /// List tournaments, newest first
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> BracketResult<Vec<Tournament>> {
        self.store
            .find_tournaments(&TournamentFilter { status })
            .await
    }

    /// Register a participant while registration is open
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidState` - Tournament not opening or registration closed
    /// * `BracketError::AlreadyRegistered` - Participant already registered
    /// * `BracketError::TournamentFull` - Tournament reached its size
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        participant: ParticipantId,
    ) -> BracketResult<Tournament> {
        let _guard = self.locks.lock(tournament_id).await;
        let mut tournament = load_tournament(self.store(), tournament_id).await?;

        if !tournament.registration_open(Utc::now()) {
            return Err(BracketError::InvalidState(format!(
                "registration for tournament {tournament_id} is closed"
            )));
        }
        if tournament.has_participant(participant) {
            return Err(BracketError::AlreadyRegistered(participant));
        }
        if tournament.is_full() {
            return Err(BracketError::TournamentFull {
                size: tournament.size,
            });
        }

        tournament.participants.push(participant);
        let saved = self.store.save_tournament(&tournament).await?;

        info!(
            "Tournament {}: registered participant {} ({}/{})",
            tournament_id,
            participant,
            saved.participants.len(),
            saved.size
        );

        Ok(saved)
    }

    /// Remove a participant before the bracket is created
    pub async fn unregister_participant(
        &self,
        tournament_id: TournamentId,
        participant: ParticipantId,
    ) -> BracketResult<Tournament> {
        let _guard = self.locks.lock(tournament_id).await;
        let mut tournament = load_tournament(self.store(), tournament_id).await?;

        if tournament.status != TournamentStatus::Opening {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} is {}, participants are fixed",
                tournament.status
            )));
        }

        let before = tournament.participants.len();
        tournament.participants.retain(|&p| p != participant);
        if tournament.participants.len() == before {
            return Err(BracketError::NotFound {
                entity: "Participant",
                id: participant,
            });
        }

        self.store.save_tournament(&tournament).await
    }

    /// Seed the participants and create the first round.
    ///
    /// Moves the tournament to `Ongoing`.
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - Tournament does not exist
    /// * `BracketError::InvalidState` - Not opening, bracket already exists, or
    ///   participant count differs from the tournament size
    pub async fn create_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketCreated> {
        let _guard = self.locks.lock(tournament_id).await;
        let tournament = load_tournament(self.store(), tournament_id).await?;
        self.create_bracket_locked(tournament).await
    }

    async fn create_bracket_locked(&self, tournament: Tournament) -> BracketResult<BracketCreated> {
        let tournament_id = tournament.id;

        if tournament.status != TournamentStatus::Opening {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} is {}, expected opening",
                tournament.status
            )));
        }
        if !tournament.rounds.is_empty() {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} already has a bracket"
            )));
        }
        if tournament.size < 2 || tournament.participants.len() != tournament.size {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} has {} of {} participants",
                tournament.participants.len(),
                tournament.size
            )));
        }

        let seeded = self.seeder.lock().await.seed(&tournament.participants)?;
        let round = Round::for_entrants(seeded.len());
        // Storing the first round also moves the tournament to Ongoing
        let matches = create_round(
            self.store(),
            tournament_id,
            &seeded,
            round,
            &tournament.topic,
            tournament.scheduled_at,
        )
        .await?;

        info!(
            "Tournament {}: bracket created, {} opens with {} match(es)",
            tournament_id,
            round.label(),
            matches.len()
        );

        Ok(BracketCreated {
            tournament_id,
            round: round.label(),
            matches_created: matches.len(),
            matches,
        })
    }

    /// Record a match winner, then advance the bracket if the round is complete.
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - Match does not exist
    /// * `BracketError::InvalidState` - Tournament not ongoing or match already completed
    /// * `BracketError::InvalidWinner` - Winner did not play this match
    pub async fn record_match_result(
        &self,
        match_id: MatchId,
        winner: ParticipantId,
    ) -> BracketResult<MatchResultOutcome> {
        let m = self.get_match(match_id).await?;
        let _guard = self.locks.lock(m.tournament_id).await;
        let tournament = load_tournament(self.store(), m.tournament_id).await?;

        if tournament.status != TournamentStatus::Ongoing {
            return Err(BracketError::InvalidState(format!(
                "tournament {} is {}, results are not accepted",
                tournament.id, tournament.status
            )));
        }
        if !tournament.rounds.contains(&match_id) {
            return Err(BracketError::InvalidState(format!(
                "match {match_id} is not part of tournament {}",
                tournament.id
            )));
        }

        let recorded = record_result(self.store(), match_id, winner).await?;
        let advancement = self.advance_locked(&tournament).await?;

        Ok(MatchResultOutcome {
            status: recorded.status,
            recorded,
            advancement,
        })
    }

    /// Advance the bracket from its latest round.
    ///
    /// Safe to repeat: a round still in play reports `Pending`, a decided
    /// Final reports `TournamentComplete`, and a completed round gets its
    /// successor only once. Recovers a bracket whose advancement failed after
    /// the deciding result was stored.
    ///
    /// # Errors
    ///
    /// * `BracketError::NotFound` - Tournament does not exist
    /// * `BracketError::InvalidState` - Tournament not ongoing
    pub async fn advance(&self, tournament_id: TournamentId) -> BracketResult<AdvanceResult> {
        let _guard = self.locks.lock(tournament_id).await;
        let tournament = load_tournament(self.store(), tournament_id).await?;

        if tournament.status != TournamentStatus::Ongoing {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} is {}, nothing to advance",
                tournament.status
            )));
        }

        self.advance_locked(&tournament).await
    }

    async fn advance_locked(&self, tournament: &Tournament) -> BracketResult<AdvanceResult> {
        // The deepest round played last; it never has a successor yet
        let latest = self
            .store
            .find_matches(&MatchFilter::in_rounds(tournament))
            .await?
            .iter()
            .map(|m| m.depth)
            .min()
            .ok_or_else(|| {
                BracketError::InvalidState(format!("tournament {} has no bracket", tournament.id))
            })?;

        try_advance(
            self.store(),
            tournament.id,
            Round::new(latest),
            &tournament.topic,
            Utc::now() + self.config.round_interval,
        )
        .await
    }

    /// Resolve placements and distribute the point budget.
    ///
    /// # Errors
    ///
    /// * `BracketError::AlreadyDistributed` - Called before; the first record is kept
    /// * `BracketError::IncompleteTournament` - Final not decided
    pub async fn finish_tournament(&self, tournament_id: TournamentId) -> BracketResult<RewardRecord> {
        let _guard = self.locks.lock(tournament_id).await;
        distribute_rewards(self.store(), tournament_id).await
    }

    /// Move a tournament one step forward in its lifecycle.
    ///
    /// `Ongoing` creates the bracket. `Finished` is only reachable from
    /// `Ongoing` and distributes rewards; if that fails the status still
    /// changes and the failure is reported as a warning. Requesting the
    /// current status is a no-op with a warning.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidState` - Backward or skipped transition, or bracket creation refused
    pub async fn update_status(
        &self,
        tournament_id: TournamentId,
        status: TournamentStatus,
    ) -> BracketResult<StatusUpdate> {
        let _guard = self.locks.lock(tournament_id).await;
        let tournament = load_tournament(self.store(), tournament_id).await?;

        if tournament.status == status {
            let rewards = self.store.find_reward_by_tournament(tournament_id).await?;
            return Ok(StatusUpdate {
                warning: Some(format!("tournament {tournament_id} is already {status}")),
                tournament,
                rewards,
            });
        }
        if !tournament.status.can_advance_to(status) {
            return Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} cannot go from {} to {status}",
                tournament.status
            )));
        }

        match status {
            TournamentStatus::Opening => Err(BracketError::InvalidState(format!(
                "tournament {tournament_id} cannot reopen"
            ))),
            TournamentStatus::Ongoing => {
                self.create_bracket_locked(tournament).await?;
                Ok(StatusUpdate {
                    tournament: load_tournament(self.store(), tournament_id).await?,
                    rewards: None,
                    warning: None,
                })
            }
            TournamentStatus::Finished => match distribute_rewards(self.store(), tournament_id).await {
                Ok(record) => Ok(StatusUpdate {
                    tournament: load_tournament(self.store(), tournament_id).await?,
                    rewards: Some(record),
                    warning: None,
                }),
                Err(e) => {
                    warn!(
                        "Tournament {}: finished without rewards: {}",
                        tournament_id, e
                    );
                    let mut tournament = load_tournament(self.store(), tournament_id).await?;
                    tournament.status = TournamentStatus::Finished;
                    let tournament = self.store.save_tournament(&tournament).await?;
                    Ok(StatusUpdate {
                        tournament,
                        rewards: None,
                        warning: Some(format!("rewards were not generated: {}", e.client_message())),
                    })
                }
            },
        }
    }

    /// Get a match
    pub async fn get_match(&self, match_id: MatchId) -> BracketResult<Match> {
        self.store
            .find_match(match_id)
            .await?
            .ok_or_else(|| BracketError::match_not_found(match_id))
    }

    /// Get the bracket of a tournament grouped by round
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let tournament = load_tournament(self.store(), tournament_id).await?;
        let matches = self
            .store
            .find_matches(&MatchFilter::in_rounds(&tournament))
            .await?;
        Ok(BracketView::from_matches(&tournament, matches))
    }

    /// Get the reward record of a finished tournament
    pub async fn get_rewards(&self, tournament_id: TournamentId) -> BracketResult<RewardRecord> {
        self.store
            .find_reward_by_tournament(tournament_id)
            .await?
            .ok_or(BracketError::NotFound {
                entity: "Reward record",
                id: tournament_id,
            })
    }
}
