//! Read queries for the catalog database.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tabletop_catalog::types::*;

use crate::operations::{OperationError, parse_timestamp};

// ── Snapshots ───────────────────────────────────────────────────────────────

/// Load every game with its family links.
pub fn load_games(conn: &Connection) -> Result<Vec<GameEntity>, OperationError> {
    let mut links = link_map(conn, "SELECT game_id, family_id FROM game_families")?;

    let mut stmt = conn.prepare(
        "SELECT id, name, kind, rating_count, average_rating, year_published, refreshed_at
         FROM games ORDER BY id",
    )?;
    let rows = stmt.query_map([], row_to_game_parts)?;

    let mut games = Vec::new();
    for row in rows {
        let parts = row?;
        let family_ids = links.remove(&parts.0).unwrap_or_default();
        games.push(game_from_parts(parts, family_ids)?);
    }
    Ok(games)
}

/// Load every family with its member links.
pub fn load_families(conn: &Connection) -> Result<Vec<FamilyEntity>, OperationError> {
    let mut links = link_map(conn, "SELECT family_id, game_id FROM family_members")?;

    let mut stmt = conn.prepare("SELECT id, name, refreshed_at FROM families ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, CatalogId>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut families = Vec::new();
    for row in rows {
        let (id, name, refreshed_at) = row?;
        families.push(FamilyEntity {
            id,
            name,
            game_ids: links.remove(&id).unwrap_or_default(),
            refreshed_at: refreshed_at.as_deref().and_then(parse_timestamp),
        });
    }
    Ok(families)
}

// ── Statistics ──────────────────────────────────────────────────────────────

/// Catalog summary counts.
#[derive(Debug, Default, Clone)]
pub struct CatalogStats {
    pub games: u64,
    pub expansions: u64,
    pub families: u64,
    pub oldest_game_refresh: Option<DateTime<Utc>>,
    pub oldest_family_refresh: Option<DateTime<Utc>>,
}

/// Get summary statistics for the catalog.
pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats, OperationError> {
    let count = |sql: &str| -> Result<u64, rusqlite::Error> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n.max(0) as u64)
    };
    let oldest = |sql: &str| -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
        conn.query_row(sql, [], |row| row.get::<_, Option<String>>(0))
            .map(|raw| raw.as_deref().and_then(parse_timestamp))
    };

    Ok(CatalogStats {
        games: count("SELECT COUNT(*) FROM games WHERE kind = 'boardgame'")?,
        expansions: count("SELECT COUNT(*) FROM games WHERE kind = 'boardgameexpansion'")?,
        families: count("SELECT COUNT(*) FROM families")?,
        oldest_game_refresh: oldest("SELECT MIN(refreshed_at) FROM games")?,
        oldest_family_refresh: oldest("SELECT MIN(refreshed_at) FROM families")?,
    })
}

// ── Row Mapping ─────────────────────────────────────────────────────────────

type GameParts = (CatalogId, String, String, u32, f64, i32, Option<String>);

fn row_to_game_parts(row: &Row) -> rusqlite::Result<GameParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn game_from_parts(
    parts: GameParts,
    family_ids: BTreeSet<CatalogId>,
) -> Result<GameEntity, OperationError> {
    let (id, name, kind, rating_count, average_rating, year_published, refreshed_at) = parts;
    let kind = kind
        .parse::<GameKind>()
        .map_err(|reason| OperationError::CorruptRow {
            entity_type: "game",
            id,
            reason,
        })?;
    Ok(GameEntity {
        id,
        name,
        kind,
        family_ids,
        rating_count,
        average_rating,
        year_published,
        refreshed_at: refreshed_at.as_deref().and_then(parse_timestamp),
    })
}

fn link_map(
    conn: &Connection,
    sql: &str,
) -> Result<HashMap<CatalogId, BTreeSet<CatalogId>>, OperationError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, CatalogId>(0)?, row.get::<_, CatalogId>(1)?))
    })?;

    let mut map: HashMap<CatalogId, BTreeSet<CatalogId>> = HashMap::new();
    for row in rows {
        let (owner, target) = row?;
        map.entry(owner).or_default().insert(target);
    }
    Ok(map)
}
