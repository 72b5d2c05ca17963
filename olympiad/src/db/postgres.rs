//! PostgreSQL implementation of the bracket repositories.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{
    repository::{
        MatchFilter, MatchRepository, RewardRepository, TournamentFilter, TournamentRepository,
    },
    timeouts::{TimeoutError, with_default_timeout},
};
use crate::bracket::{
    BracketError, BracketResult,
    models::{
        Match, MatchId, MatchStatus, NewMatch, NewTournament, RewardEntry, RewardRecord,
        Tournament, TournamentId, TournamentStatus,
    },
};

const TOURNAMENT_COLUMNS: &str = "id, name, description, scheduled_at, size, max_score, pi_points, \
     registration_closes_at, topic, status, participants, rounds, pi_wards, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, tournament_id, depth, round, task, scheduled_at, slot_a, slot_b, \
     winner, loser, status, created_at";

/// Bracket store backed by PostgreSQL.
///
/// Tournaments keep denormalized `BIGINT[]` id lists (`participants`,
/// `rounds`, `pi_wards`); matches reference their tournament directly.
#[derive(Clone)]
pub struct PgBracketStore {
    pool: PgPool,
}

impl PgBracketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tournament_from_row(row: &PgRow) -> BracketResult<Tournament> {
    let status: String = row.get("status");
    let status = TournamentStatus::parse(&status)
        .ok_or_else(|| BracketError::InvalidState(format!("unknown tournament status {status}")))?;
    let size: i32 = row.get("size");

    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        scheduled_at: row.get("scheduled_at"),
        size: size as usize,
        max_score: row.get("max_score"),
        pi_points: row.get("pi_points"),
        registration_closes_at: row.get("registration_closes_at"),
        topic: row.get("topic"),
        status,
        participants: row.get("participants"),
        rounds: row.get("rounds"),
        pi_wards: row.get("pi_wards"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.get("status");
    let status = MatchStatus::parse(&status)
        .ok_or_else(|| BracketError::InvalidState(format!("unknown match status {status}")))?;
    let depth: i32 = row.get("depth");

    Ok(Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        depth: depth as u32,
        round: row.get("round"),
        task: row.get("task"),
        scheduled_at: row.get("scheduled_at"),
        slot_a: row.get("slot_a"),
        slot_b: row.get("slot_b"),
        winner: row.get("winner"),
        loser: row.get("loser"),
        status,
        created_at: row.get("created_at"),
    })
}

fn reward_from_row(row: &PgRow) -> BracketResult<RewardRecord> {
    let entries: serde_json::Value = row.get("entries");
    Ok(RewardRecord {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        entries: serde_json::from_value(entries)?,
        created_at: row.get("created_at"),
    })
}

/// A write referencing a missing tournament trips the foreign key
fn missing_tournament(err: TimeoutError, tournament_id: TournamentId) -> BracketError {
    match err {
        TimeoutError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
            BracketError::tournament_not_found(tournament_id)
        }
        other => other.into(),
    }
}

#[async_trait]
impl TournamentRepository for PgBracketStore {
    async fn create_tournament(&self, new: &NewTournament) -> BracketResult<Tournament> {
        let sql = format!(
            r#"
            INSERT INTO tournaments (name, description, scheduled_at, size, max_score, pi_points,
                                     registration_closes_at, topic, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&new.name)
                .bind(&new.description)
                .bind(new.scheduled_at)
                .bind(new.size as i32)
                .bind(new.max_score)
                .bind(new.pi_points)
                .bind(new.registration_closes_at)
                .bind(&new.topic)
                .bind(TournamentStatus::Opening.as_str())
                .fetch_one(&self.pool),
        )
        .await?;

        tournament_from_row(&row)
    }

    async fn find_tournament(&self, id: TournamentId) -> BracketResult<Option<Tournament>> {
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn find_tournaments(&self, filter: &TournamentFilter) -> BracketResult<Vec<Tournament>> {
        let sql = format!(
            r#"
            SELECT {TOURNAMENT_COLUMNS}
            FROM tournaments
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "#
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.status.map(TournamentStatus::as_str))
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn save_tournament(&self, tournament: &Tournament) -> BracketResult<Tournament> {
        let sql = format!(
            r#"
            INSERT INTO tournaments (id, name, description, scheduled_at, size, max_score, pi_points,
                                     registration_closes_at, topic, status, participants, rounds,
                                     pi_wards, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                scheduled_at = EXCLUDED.scheduled_at,
                size = EXCLUDED.size,
                max_score = EXCLUDED.max_score,
                pi_points = EXCLUDED.pi_points,
                registration_closes_at = EXCLUDED.registration_closes_at,
                topic = EXCLUDED.topic,
                status = EXCLUDED.status,
                participants = EXCLUDED.participants,
                rounds = EXCLUDED.rounds,
                pi_wards = EXCLUDED.pi_wards,
                updated_at = NOW()
            RETURNING {TOURNAMENT_COLUMNS}
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament.id)
                .bind(&tournament.name)
                .bind(&tournament.description)
                .bind(tournament.scheduled_at)
                .bind(tournament.size as i32)
                .bind(tournament.max_score)
                .bind(tournament.pi_points)
                .bind(tournament.registration_closes_at)
                .bind(&tournament.topic)
                .bind(tournament.status.as_str())
                .bind(&tournament.participants)
                .bind(&tournament.rounds)
                .bind(&tournament.pi_wards)
                .bind(tournament.created_at)
                .fetch_one(&self.pool),
        )
        .await?;

        tournament_from_row(&row)
    }
}

#[async_trait]
impl MatchRepository for PgBracketStore {
    async fn append_round(
        &self,
        tournament_id: TournamentId,
        new_matches: &[NewMatch],
    ) -> BracketResult<Vec<Match>> {
        let mut tx = with_default_timeout(self.pool.begin()).await?;

        // Row lock serializes appends across processes
        with_default_timeout(
            sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
                .bind(tournament_id)
                .fetch_optional(&mut *tx),
        )
        .await?
        .ok_or_else(|| BracketError::tournament_not_found(tournament_id))?;

        let sql = format!(
            r#"
            INSERT INTO matches (tournament_id, depth, round, task, scheduled_at, slot_a, slot_b,
                                 winner, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MATCH_COLUMNS}
            "#
        );
        let mut created = Vec::with_capacity(new_matches.len());
        for new in new_matches {
            let (status, winner) = new.initial_result();
            let row = with_default_timeout(
                sqlx::query(&sql)
                    .bind(tournament_id)
                    .bind(new.round.depth as i32)
                    .bind(new.round.label())
                    .bind(&new.task)
                    .bind(new.scheduled_at)
                    .bind(new.slot_a)
                    .bind(new.slot_b)
                    .bind(winner)
                    .bind(status.as_str())
                    .fetch_one(&mut *tx),
            )
            .await?;
            created.push(match_from_row(&row)?);
        }

        let ids: Vec<MatchId> = created.iter().map(|m| m.id).collect();
        with_default_timeout(
            sqlx::query(
                r#"
                UPDATE tournaments
                SET rounds = array_cat(rounds, $2::BIGINT[]),
                    status = CASE WHEN status = $3 THEN $4 ELSE status END,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(tournament_id)
            .bind(&ids)
            .bind(TournamentStatus::Opening.as_str())
            .bind(TournamentStatus::Ongoing.as_str())
            .execute(&mut *tx),
        )
        .await?;

        with_default_timeout(tx.commit()).await?;
        Ok(created)
    }

    async fn find_match(&self, id: MatchId) -> BracketResult<Option<Match>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn find_matches(&self, filter: &MatchFilter) -> BracketResult<Vec<Match>> {
        let sql = format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE ($1::BIGINT IS NULL OR tournament_id = $1)
              AND ($2::BIGINT[] IS NULL OR id = ANY($2))
              AND ($3::INT IS NULL OR depth = $3)
            ORDER BY id ASC
            "#
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.tournament_id)
                .bind(filter.ids.as_deref())
                .bind(filter.depth.map(|d| d as i32))
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn save_match(&self, m: &Match) -> BracketResult<Match> {
        let sql = format!(
            r#"
            INSERT INTO matches (id, tournament_id, depth, round, task, scheduled_at, slot_a, slot_b,
                                 winner, loser, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                task = EXCLUDED.task,
                scheduled_at = EXCLUDED.scheduled_at,
                winner = EXCLUDED.winner,
                loser = EXCLUDED.loser,
                status = EXCLUDED.status
            RETURNING {MATCH_COLUMNS}
            "#
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(m.id)
                .bind(m.tournament_id)
                .bind(m.depth as i32)
                .bind(&m.round)
                .bind(&m.task)
                .bind(m.scheduled_at)
                .bind(m.slot_a)
                .bind(m.slot_b)
                .bind(m.winner)
                .bind(m.loser)
                .bind(m.status.as_str())
                .bind(m.created_at)
                .fetch_one(&self.pool),
        )
        .await?;

        match_from_row(&row)
    }
}

#[async_trait]
impl RewardRepository for PgBracketStore {
    async fn create_reward(
        &self,
        tournament_id: TournamentId,
        entries: &[RewardEntry],
    ) -> BracketResult<RewardRecord> {
        let entries_json = serde_json::to_value(entries)?;
        let mut tx = with_default_timeout(self.pool.begin()).await?;

        // tournament_id is UNIQUE, so a second record never lands
        let row = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO reward_records (tournament_id, entries)
                VALUES ($1, $2)
                ON CONFLICT (tournament_id) DO NOTHING
                RETURNING id, tournament_id, entries, created_at
                "#,
            )
            .bind(tournament_id)
            .bind(entries_json)
            .fetch_optional(&mut *tx),
        )
        .await
        .map_err(|e| missing_tournament(e, tournament_id))?
        .ok_or(BracketError::AlreadyDistributed(tournament_id))?;
        let record = reward_from_row(&row)?;

        with_default_timeout(
            sqlx::query(
                r#"
                UPDATE tournaments
                SET pi_wards = array_append(pi_wards, $2),
                    status = $3,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(tournament_id)
            .bind(record.id)
            .bind(TournamentStatus::Finished.as_str())
            .execute(&mut *tx),
        )
        .await?;

        with_default_timeout(tx.commit()).await?;
        Ok(record)
    }

    async fn find_reward_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<RewardRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, tournament_id, entries, created_at FROM reward_records WHERE tournament_id = $1",
            )
            .bind(tournament_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(reward_from_row).transpose()
    }
}

