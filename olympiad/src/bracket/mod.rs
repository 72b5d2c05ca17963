//! Single-elimination bracket engine.
//!
//! This module provides:
//! - Shuffled seeding and round naming
//! - Match creation, including byes for odd fields
//! - Match result recording
//! - Round advancement up to a champion
//! - Placement resolution and reward distribution
//!
//! ## Example
//!
//! ```no_run
//! use olympiad::bracket::{BracketConfig, BracketEngine, NewTournament};
//! use olympiad::db::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = BracketEngine::new(Arc::new(MemoryStore::new()), BracketConfig::default());
//!
//!     let tournament = engine
//!         .create_tournament(NewTournament::new("Spring Olympiad", 4, 1000))
//!         .await?;
//!     for student in [11, 12, 13, 14] {
//!         engine.register_participant(tournament.id, student).await?;
//!     }
//!
//!     let bracket = engine.create_bracket(tournament.id).await?;
//!     println!("{}: {} matches", bracket.round, bracket.matches_created);
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod config;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod locks;
pub mod models;
pub mod placement;
pub mod rewards;
pub mod seeding;
pub mod state_machine;

pub use config::BracketConfig;
pub use engine::{BracketCreated, BracketEngine, MatchResultOutcome, StatusUpdate};
pub use errors::{BracketError, BracketResult};
pub use models::{
    AdvanceResult, BracketView, Match, MatchId, MatchStatus, NewMatch, NewTournament,
    ParticipantId, Placement, RewardEntry, RewardRecord, RewardRecordId, Round, RoundView,
    Tournament, TournamentId, TournamentStatus,
};
pub use seeding::{Seeder, round_name};

use crate::db::{BracketStore, TournamentRepository};

/// Load a tournament or fail with `NotFound`
pub(crate) async fn load_tournament(
    store: &dyn BracketStore,
    tournament_id: TournamentId,
) -> BracketResult<Tournament> {
    store
        .find_tournament(tournament_id)
        .await?
        .ok_or_else(|| BracketError::tournament_not_found(tournament_id))
}
