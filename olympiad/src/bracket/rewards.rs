//! Reward distribution: split a tournament's point budget across placements.

use super::{
    errors::{BracketError, BracketResult},
    load_tournament,
    models::{Placement, RewardEntry, RewardRecord, TournamentId},
    placement::resolve_placements,
};
use crate::db::{BracketStore, RewardRepository};
use log::info;

/// Whole budget expressed in per-mille.
const FULL_BUDGET_PERMILLE: i64 = 1000;

/// Share of the budget for a place, in per-mille
///
/// 1st 35%, 2nd 20%, 3rd-4th 15%, 5th-8th 7.5%, nothing below.
pub fn tier_permille(place: u32) -> i64 {
    match place {
        1 => 350,
        2 => 200,
        3..=4 => 150,
        5..=8 => 75,
        _ => 0,
    }
}

/// Allocate `budget` points across `placements`.
///
/// Each place receives `floor(budget * tier / 1000)`. A full top-8 claims
/// 115% of the budget, so when the tiers present sum above 100% every share
/// is scaled down proportionally and the total never exceeds the budget.
pub fn allocate(budget: i64, placements: &[Placement]) -> Vec<RewardEntry> {
    let claimed: i64 = placements.iter().map(|p| tier_permille(p.place)).sum();
    let denominator = claimed.max(FULL_BUDGET_PERMILLE);
    let budget = budget.max(0);

    placements
        .iter()
        .map(|p| RewardEntry {
            participant: p.participant,
            points: ((i128::from(budget) * i128::from(tier_permille(p.place)))
                / i128::from(denominator)) as i64,
            place: p.place,
        })
        .collect()
}

/// Resolve placements, persist the reward record and finish the tournament.
///
/// Callers must hold the tournament's lock.
///
/// # Errors
///
/// * `BracketError::NotFound` - Tournament does not exist
/// * `BracketError::AlreadyDistributed` - A reward record already exists
/// * `BracketError::IncompleteTournament` - Final not decided
pub async fn distribute_rewards(
    store: &dyn BracketStore,
    tournament_id: TournamentId,
) -> BracketResult<RewardRecord> {
    let tournament = load_tournament(store, tournament_id).await?;

    if store.find_reward_by_tournament(tournament_id).await?.is_some()
        || !tournament.pi_wards.is_empty()
    {
        return Err(BracketError::AlreadyDistributed(tournament_id));
    }

    let placements = resolve_placements(store, tournament_id).await?;
    let entries = allocate(tournament.pi_points, &placements);
    // Links the record and finishes the tournament in the same write
    let record = store.create_reward(tournament_id, &entries).await?;

    info!(
        "Tournament {}: distributed {} of {} points across {} placement(s)",
        tournament_id,
        record.total_points(),
        tournament.pi_points,
        record.entries.len()
    );

    Ok(record)
}
