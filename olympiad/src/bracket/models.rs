//! Bracket data models: tournaments, matches, rounds, placements and rewards.

use super::errors::{BracketError, BracketResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Reward record ID type
pub type RewardRecordId = i64;

/// Opaque participant (student) identifier
pub type ParticipantId = i64;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting registrations
    Opening,
    /// Bracket created, matches in progress
    Ongoing,
    /// Rewards distributed
    Finished,
}

impl TournamentStatus {
    /// Status moves one step at a time: Opening -> Ongoing -> Finished.
    pub fn can_advance_to(self, next: TournamentStatus) -> bool {
        matches!(
            (self, next),
            (TournamentStatus::Opening, TournamentStatus::Ongoing)
                | (TournamentStatus::Ongoing, TournamentStatus::Finished)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Opening => "opening",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "opening" => Some(TournamentStatus::Opening),
            "ongoing" => Some(TournamentStatus::Ongoing),
            "finished" => Some(TournamentStatus::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Completed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(MatchStatus::Pending),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer of the bracket, identified by its distance from the final.
///
/// Depth 0 is the Final, 1 the Semifinal, 2 the Quarterfinal and so on.
/// The display label is always derived from the depth, never parsed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Round {
    pub depth: u32,
}

impl Round {
    pub const FINAL: Round = Round { depth: 0 };
    pub const SEMIFINAL: Round = Round { depth: 1 };
    pub const QUARTERFINAL: Round = Round { depth: 2 };

    pub fn new(depth: u32) -> Self {
        Self { depth }
    }

    /// Round that a field of `entrants` players is playing.
    ///
    /// Depth is `ceil(log2(entrants)) - 1`, so 2 entrants play the Final,
    /// 3-4 the Semifinal, 5-8 the Quarterfinal. A single entrant maps to
    /// the Final as well.
    pub fn for_entrants(entrants: usize) -> Self {
        if entrants <= 2 {
            return Round::FINAL;
        }
        let slots = entrants.next_power_of_two();
        Round {
            depth: slots.trailing_zeros() - 1,
        }
    }

    /// Number of bracket slots in this round (2 for the Final, 4 for the Semifinal...).
    pub fn slots(self) -> u64 {
        1u64 << (self.depth + 1)
    }

    /// Human label for this round
    pub fn label(self) -> String {
        match self.depth {
            0 => "Final".to_string(),
            1 => "Semifinal".to_string(),
            2 => "Quarterfinal".to_string(),
            _ => format!("Round of {}", self.slots()),
        }
    }

    /// The round played after this one, `None` after the Final.
    pub fn next(self) -> Option<Round> {
        self.depth.checked_sub(1).map(Round::new)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Tournament document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    /// Expected participant count; the bracket is created once it is reached.
    pub size: usize,
    pub max_score: i32,
    /// Point budget distributed when the tournament finishes
    pub pi_points: i64,
    pub registration_closes_at: Option<DateTime<Utc>>,
    pub topic: String,
    pub status: TournamentStatus,
    pub participants: Vec<ParticipantId>,
    /// Match ids in creation order, appended round by round
    pub rounds: Vec<MatchId>,
    /// Reward records, at most one
    pub pi_wards: Vec<RewardRecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.size
    }

    pub fn has_participant(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }

    pub fn registration_open(&self, now: DateTime<Utc>) -> bool {
        self.status == TournamentStatus::Opening
            && self.registration_closes_at.is_none_or(|closes| now < closes)
    }
}

/// Fields required to create a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub size: usize,
    #[serde(default)]
    pub max_score: i32,
    pub pi_points: i64,
    #[serde(default)]
    pub registration_closes_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topic: String,
}

impl NewTournament {
    /// Create a tournament definition with empty description and topic
    pub fn new(name: impl Into<String>, size: usize, pi_points: i64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            scheduled_at: Utc::now(),
            size,
            max_score: 0,
            pi_points,
            registration_closes_at: None,
            topic: String::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_registration_closing(mut self, closes_at: DateTime<Utc>) -> Self {
        self.registration_closes_at = Some(closes_at);
        self
    }

    pub fn validate(&self) -> BracketResult<()> {
        if self.name.trim().is_empty() {
            return Err(BracketError::InvalidInput(
                "tournament name must not be empty".to_string(),
            ));
        }
        if self.size < 2 {
            return Err(BracketError::InvalidInput(format!(
                "tournament size must be at least 2, got {}",
                self.size
            )));
        }
        if self.pi_points < 0 {
            return Err(BracketError::InvalidInput(format!(
                "point budget must not be negative, got {}",
                self.pi_points
            )));
        }
        Ok(())
    }
}

/// One bracket node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub depth: u32,
    /// Display label derived from `depth`
    pub round: String,
    pub task: String,
    pub scheduled_at: DateTime<Utc>,
    pub slot_a: ParticipantId,
    /// `None` for a bye
    pub slot_b: Option<ParticipantId>,
    pub winner: Option<ParticipantId>,
    pub loser: Option<ParticipantId>,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn round(&self) -> Round {
        Round::new(self.depth)
    }

    pub fn is_bye(&self) -> bool {
        self.slot_b.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.slot_a == participant || self.slot_b == Some(participant)
    }

    /// Record `winner` and move the match to `Completed`.
    ///
    /// The loser is whichever slot did not win. Byes are created completed,
    /// so this never applies to them.
    pub fn complete(&mut self, winner: ParticipantId) -> BracketResult<()> {
        if self.status == MatchStatus::Completed {
            return Err(BracketError::InvalidState(format!(
                "match {} is already completed",
                self.id
            )));
        }

        if !self.involves(winner) {
            return Err(BracketError::InvalidWinner {
                match_id: self.id,
                participant: winner,
            });
        }

        self.winner = Some(winner);
        self.loser = if winner == self.slot_a {
            self.slot_b
        } else {
            Some(self.slot_a)
        };
        self.status = MatchStatus::Completed;
        Ok(())
    }
}

/// Match as handed to the store for creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub round: Round,
    pub task: String,
    pub scheduled_at: DateTime<Utc>,
    pub slot_a: ParticipantId,
    pub slot_b: Option<ParticipantId>,
}

impl NewMatch {
    /// Initial status, winner and loser of this match.
    ///
    /// A bye advances `slot_a` immediately.
    pub fn initial_result(&self) -> (MatchStatus, Option<ParticipantId>) {
        match self.slot_b {
            Some(_) => (MatchStatus::Pending, None),
            None => (MatchStatus::Completed, Some(self.slot_a)),
        }
    }
}

/// Final rank of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub participant: ParticipantId,
    /// 1 = champion, 2 = runner-up, 3-4 semifinal losers, 5-8 quarterfinal losers
    pub place: u32,
}

/// Points awarded to one placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub participant: ParticipantId,
    pub points: i64,
    pub place: u32,
}

/// Immutable award record created when a tournament finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub id: RewardRecordId,
    pub tournament_id: TournamentId,
    pub entries: Vec<RewardEntry>,
    pub created_at: DateTime<Utc>,
}

impl RewardRecord {
    pub fn total_points(&self) -> i64 {
        self.entries.iter().map(|e| e.points).sum()
    }
}

/// Outcome of checking a round for completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvanceResult {
    /// Some matches of the round are still pending
    Pending { completed: usize, total: usize },
    /// The round finished and the next one was generated
    NextRound { round: String, matches: Vec<Match> },
    /// The Final has been decided
    TournamentComplete { champion: ParticipantId },
}

/// A round of the bracket with its matches, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub depth: u32,
    pub label: String,
    pub matches: Vec<Match>,
}

impl RoundView {
    pub fn is_complete(&self) -> bool {
        self.matches.iter().all(Match::is_completed)
    }
}

/// Whole bracket of a tournament, first round first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub rounds: Vec<RoundView>,
}

impl BracketView {
    /// Group `matches` (in creation order) by round, deepest round first.
    pub fn from_matches(tournament: &Tournament, matches: Vec<Match>) -> Self {
        let mut rounds: Vec<RoundView> = Vec::new();
        for m in matches {
            match rounds.iter_mut().find(|r| r.depth == m.depth) {
                Some(round) => round.matches.push(m),
                None => rounds.push(RoundView {
                    depth: m.depth,
                    label: m.round().label(),
                    matches: vec![m],
                }),
            }
        }
        rounds.sort_by(|a, b| b.depth.cmp(&a.depth));

        Self {
            tournament_id: tournament.id,
            status: tournament.status,
            rounds,
        }
    }
}
