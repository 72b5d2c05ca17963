//! Per-tournament critical sections.
//!
//! Round advancement reads the round's matches and then appends the next
//! round; reward distribution reads then writes the tournament. Both hold the
//! tournament's lock for the whole read-then-write sequence.

use super::models::TournamentId;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<TournamentId, Arc<AsyncMutex<()>>>;

/// Keyed async mutex, one entry per tournament currently locked or awaited
#[derive(Clone, Default)]
pub struct TournamentLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for exclusive access to `tournament_id`.
    ///
    /// The returned guard releases the lock when dropped, and forgets the
    /// tournament's entry once nobody else holds or awaits it.
    pub async fn lock(&self, tournament_id: TournamentId) -> TournamentGuard {
        let lock = self.map().entry(tournament_id).or_default().clone();
        let guard = lock.lock_owned().await;

        TournamentGuard {
            tournament_id,
            locks: self.clone(),
            guard: Some(guard),
        }
    }

    /// Number of tournaments with a lock entry
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.map().len()
    }
}

/// Exclusive access to one tournament
pub struct TournamentGuard {
    tournament_id: TournamentId,
    locks: TournamentLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TournamentGuard {
    fn drop(&mut self) {
        // Waiters clone the entry under the map lock, so the count is stable here
        let mut locks = self.locks.map();
        self.guard.take();
        if locks
            .get(&self.tournament_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.tournament_id);
        }
    }
}
