use std::collections::HashMap;
use std::time::Duration;

use tabletop_catalog::{CatalogId, FamilyEntity, GameEntity};

use crate::frontier::Frontier;

/// Family the crawl is seeded from when the catalog is empty.
pub const DEFAULT_SEED_FAMILY: CatalogId = 8374;

/// Games the crawl is seeded from when the catalog is empty.
pub const DEFAULT_SEED_GAMES: &[CatalogId] = &[
    13, 822, 9209, 30549, 36218, 68448, 70323, 129622, 148228, 167791, 169786, 173346, 174430,
    178900, 224517, 230802, 266192, 291457, 316554, 342942,
];

/// Crawl pacing and seeding.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    /// Families refreshed longer ago than this are fetched again.
    pub family_staleness: chrono::Duration,
    /// Games refreshed longer ago than this are fetched again.
    pub game_staleness: chrono::Duration,
    /// How long to sleep after a cycle that fetched nothing.
    pub idle_interval: Duration,
    pub seed_family_ids: Vec<CatalogId>,
    pub seed_game_ids: Vec<CatalogId>,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            family_staleness: chrono::Duration::days(4),
            game_staleness: chrono::Duration::days(28),
            idle_interval: Duration::from_secs(4 * 60 * 60),
            seed_family_ids: vec![DEFAULT_SEED_FAMILY],
            seed_game_ids: DEFAULT_SEED_GAMES.to_vec(),
        }
    }
}

/// Working state of the crawl: what is known and what is pending.
#[derive(Debug, Default, Clone)]
pub struct CrawlState {
    pub games: HashMap<CatalogId, GameEntity>,
    pub families: HashMap<CatalogId, FamilyEntity>,
    pub game_frontier: Frontier,
    pub family_frontier: Frontier,
}

impl CrawlState {
    /// Build the starting state from a persisted snapshot plus seeds.
    ///
    /// Every family a known game belongs to and every member of a known
    /// family is queued, so stale entries get revisited.
    pub fn from_snapshot(
        games: Vec<GameEntity>,
        families: Vec<FamilyEntity>,
        policy: &CrawlPolicy,
    ) -> Self {
        let mut state = Self::default();

        for game in games {
            state.family_frontier.extend(game.family_ids.iter().copied());
            state.games.insert(game.id, game);
        }
        for family in families {
            state.game_frontier.extend(family.game_ids.iter().copied());
            state.families.insert(family.id, family);
        }

        state.family_frontier.extend(policy.seed_family_ids.iter().copied());
        state.game_frontier.extend(policy.seed_game_ids.iter().copied());
        state
    }
}
