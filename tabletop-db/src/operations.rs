//! Write operations for games and families.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use tabletop_catalog::types::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt {entity_type} row {id}: {reason}")]
    CorruptRow {
        entity_type: &'static str,
        id: CatalogId,
        reason: String,
    },
}

// ── Game Operations ─────────────────────────────────────────────────────────

/// Insert or replace a game, replacing its family links wholesale.
pub fn upsert_game(conn: &Connection, game: &GameEntity) -> Result<(), OperationError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO games (id, name, kind, rating_count, average_rating, year_published, refreshed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             kind = excluded.kind,
             rating_count = excluded.rating_count,
             average_rating = excluded.average_rating,
             year_published = excluded.year_published,
             refreshed_at = excluded.refreshed_at",
        params![
            game.id,
            game.name,
            game.kind.as_str(),
            game.rating_count,
            game.average_rating,
            game.year_published,
            game.refreshed_at.map(format_timestamp),
        ],
    )?;

    tx.execute(
        "DELETE FROM game_families WHERE game_id = ?1",
        params![game.id],
    )?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO game_families (game_id, family_id) VALUES (?1, ?2)")?;
        for family_id in &game.family_ids {
            stmt.execute(params![game.id, family_id])?;
        }
    }

    tx.commit()?;
    Ok(())
}

// ── Family Operations ───────────────────────────────────────────────────────

/// Insert or replace a family, replacing its member links wholesale.
pub fn upsert_family(conn: &Connection, family: &FamilyEntity) -> Result<(), OperationError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO families (id, name, refreshed_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             refreshed_at = excluded.refreshed_at",
        params![
            family.id,
            family.name,
            family.refreshed_at.map(format_timestamp),
        ],
    )?;

    tx.execute(
        "DELETE FROM family_members WHERE family_id = ?1",
        params![family.id],
    )?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO family_members (family_id, game_id) VALUES (?1, ?2)")?;
        for game_id in &family.game_ids {
            stmt.execute(params![family.id, game_id])?;
        }
    }

    tx.commit()?;
    Ok(())
}

// ── Timestamps ──────────────────────────────────────────────────────────────

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
