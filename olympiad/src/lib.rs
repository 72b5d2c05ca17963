//! # Olympiad
//!
//! Single-elimination tournament brackets for competition platforms.
//!
//! A tournament collects a fixed number of participants, shuffles them into a
//! bracket, and advances winners round by round until one champion remains.
//! Finishing a tournament ranks the top finishers and splits a point budget
//! between them.
//!
//! ## Lifecycle
//!
//! - **Opening**: Participants register
//! - **Ongoing**: Bracket created, results recorded, rounds generated
//! - **Finished**: Placements resolved and rewards distributed
//!
//! ## Core Modules
//!
//! - [`bracket`]: Engine, seeding, advancement, placements and rewards
//! - [`db`]: Storage traits with PostgreSQL and in-memory implementations

/// Bracket engine and tournament lifecycle.
pub mod bracket;
pub use bracket::{
    BracketConfig, BracketEngine, BracketError, BracketResult, Match, MatchStatus, NewTournament,
    Round, Tournament, TournamentStatus,
};

/// Storage layer.
pub mod db;
pub use db::{BracketStore, Database, DatabaseConfig, MemoryStore, PgBracketStore};
