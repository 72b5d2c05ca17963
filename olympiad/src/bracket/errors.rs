//! Bracket error types.

use super::models::{MatchId, ParticipantId, TournamentId};
use crate::db::timeouts::TimeoutError;
use thiserror::Error;

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Tournament, match or reward record does not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Operation attempted on an entity not in the required lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Supplied winner is not one of the match's opponents
    #[error("Participant {participant} did not play match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        participant: ParticipantId,
    },

    /// Placement requested before the Final was decided
    #[error("Tournament {0} has no completed final")]
    IncompleteTournament(TournamentId),

    /// Rewards requested twice
    #[error("Rewards already distributed for tournament {0}")]
    AlreadyDistributed(TournamentId),

    /// Participant already registered
    #[error("Participant {0} is already registered")]
    AlreadyRegistered(ParticipantId),

    /// No room left in the tournament
    #[error("Tournament is full: {size} participants")]
    TournamentFull { size: usize },

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error(transparent)]
    Timeout(TimeoutError),

    /// Reward entries could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BracketError {
    pub fn tournament_not_found(id: TournamentId) -> Self {
        BracketError::NotFound {
            entity: "Tournament",
            id,
        }
    }

    pub fn match_not_found(id: MatchId) -> Self {
        BracketError::NotFound { entity: "Match", id }
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Serialization(_) => {
                "Internal server error".to_string()
            }
            BracketError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Only an expired deadline stays a timeout; query failures are database errors.
impl From<TimeoutError> for BracketError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Database(e) => BracketError::Database(e),
            timeout @ TimeoutError::Timeout(_) => BracketError::Timeout(timeout),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
