//! Bracket engine configuration.

use chrono::Duration;

/// Bracket engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketConfig {
    /// Spacing between a round's completion and the next round's scheduled time.
    /// Informational only; start times are never enforced.
    pub round_interval: Duration,

    /// Fixed seed for bracket shuffling, for reproducible brackets
    pub seed: Option<u64>,
}

impl BracketConfig {
    /// Load configuration from environment variables
    ///
    /// - `ROUND_INTERVAL_MINUTES`: spacing between rounds (default: 60)
    /// - `BRACKET_SEED`: fixed shuffle seed (default: unset, fresh entropy)
    pub fn from_env() -> Self {
        let round_interval_minutes = std::env::var("ROUND_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let seed = std::env::var("BRACKET_SEED")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            round_interval: Duration::minutes(round_interval_minutes),
            seed,
        }
    }
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            round_interval: Duration::minutes(60),
            seed: None,
        }
    }
}
