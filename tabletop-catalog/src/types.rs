//! Data model types for the tabletop catalog.
//!
//! Two entity kinds reference each other: games list the families they belong
//! to, and families list their member games. Both link sets are authoritative
//! snapshots of the upstream service and are replaced wholesale on refresh.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stable upstream identifier for games and families.
pub type CatalogId = u32;

// ── Game ────────────────────────────────────────────────────────────────────

/// Whether a catalog entry is a standalone game or an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    BaseGame,
    Expansion,
}

impl GameKind {
    /// The upstream `type` tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::BaseGame => "boardgame",
            GameKind::Expansion => "boardgameexpansion",
        }
    }
}

impl std::str::FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boardgame" => Ok(GameKind::BaseGame),
            "boardgameexpansion" => Ok(GameKind::Expansion),
            other => Err(format!("unknown game kind '{other}'")),
        }
    }
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A game or expansion as known to the local catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEntity {
    pub id: CatalogId,
    pub name: String,
    pub kind: GameKind,
    /// Families this game belongs to, as of the last refresh.
    pub family_ids: BTreeSet<CatalogId>,
    pub rating_count: u32,
    pub average_rating: f64,
    /// Year of first publication; 0 when unknown.
    pub year_published: i32,
    /// When this entry was last fetched from upstream. `None` until stamped.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl GameEntity {
    /// True if the publication year is known.
    pub fn has_known_year(&self) -> bool {
        self.year_published != 0
    }
}

// ── Family ──────────────────────────────────────────────────────────────────

/// An upstream grouping of related games (a series, or a base game plus its
/// expansions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyEntity {
    pub id: CatalogId,
    pub name: String,
    /// Member games, as of the last refresh.
    pub game_ids: BTreeSet<CatalogId>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

// ── Staleness ───────────────────────────────────────────────────────────────

/// Returns true if an entry refreshed at `refreshed_at` should be fetched
/// again at `now`, given a maximum age of `window`.
///
/// Never-refreshed entries are always stale. A window reaching back past the
/// earliest representable time never expires.
pub fn is_stale(refreshed_at: Option<DateTime<Utc>>, window: Duration, now: DateTime<Utc>) -> bool {
    match refreshed_at {
        None => true,
        Some(at) => now
            .checked_sub_signed(window)
            .is_some_and(|cutoff| at <= cutoff),
    }
}
