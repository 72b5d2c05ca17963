//! Participant seeding and round naming.

use super::{
    errors::{BracketError, BracketResult},
    models::{ParticipantId, Round},
};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Shuffles participants into a bracket order.
///
/// The random source is owned by the seeder so tests can inject a fixed seed.
pub struct Seeder {
    rng: StdRng,
}

impl Seeder {
    /// Create a seeder backed by fresh entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Create a deterministic seeder
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Return `participants` in a pseudo-random order.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidState` - No participants to seed
    pub fn seed(&mut self, participants: &[ParticipantId]) -> BracketResult<Vec<ParticipantId>> {
        if participants.is_empty() {
            return Err(BracketError::InvalidState(
                "cannot seed an empty participant list".to_string(),
            ));
        }

        let mut seeded = participants.to_vec();
        seeded.shuffle(&mut self.rng);
        Ok(seeded)
    }
}

impl Default for Seeder {
    fn default() -> Self {
        Self::new()
    }
}

/// Human label for a round with `entrant_count` entrants.
pub fn round_name(entrant_count: usize) -> String {
    Round::for_entrants(entrant_count).label()
}
