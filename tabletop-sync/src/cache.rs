//! In-memory name index over persisted games.
//!
//! The index is rebuilt wholesale from the store and swapped in under the
//! lock, so a lookup sees either the old index or the new one. The replaced
//! index is freed after the lock is released.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Datelike;
use tabletop_catalog::{Clock, GameEntity, GameStore, StoreError};
use tokio_util::sync::CancellationToken;

/// Lookup key for a game name: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Order of magnitude of ratings per year since publication.
///
/// Years since publication are clamped to at least one. A game with no
/// ratings scores `i32::MIN`.
pub fn buzz_score(rating_count: u32, year_published: i32, current_year: i32) -> i32 {
    let years = current_year.saturating_sub(year_published).max(1);
    let per_year = f64::from(rating_count) / f64::from(years);
    per_year.log10().floor() as i32
}

/// Compare two same-named candidates. `Greater` means `a` is preferred.
///
/// Buzz decides when both years are known and the scores differ; otherwise
/// the higher average rating wins, then the higher rating count, then the
/// lower id.
pub fn compare_candidates(a: &GameEntity, b: &GameEntity, current_year: i32) -> Ordering {
    if a.has_known_year() && b.has_known_year() {
        let buzz_a = buzz_score(a.rating_count, a.year_published, current_year);
        let buzz_b = buzz_score(b.rating_count, b.year_published, current_year);
        if buzz_a != buzz_b {
            return buzz_a.cmp(&buzz_b);
        }
    }
    a.average_rating
        .total_cmp(&b.average_rating)
        .then_with(|| a.rating_count.cmp(&b.rating_count))
        .then_with(|| b.id.cmp(&a.id))
}

fn build_index(games: Vec<GameEntity>) -> HashMap<String, Vec<GameEntity>> {
    let mut index: HashMap<String, Vec<GameEntity>> = HashMap::new();
    for game in games {
        index.entry(normalize_name(&game.name)).or_default().push(game);
    }
    index
}

/// Name-to-game index with same-name disambiguation.
pub struct GameCache<S> {
    store: S,
    clock: Arc<dyn Clock>,
    index: Mutex<HashMap<String, Vec<GameEntity>>>,
}

impl<S: GameStore> GameCache<S> {
    /// Create an empty cache. Call [`rebuild`](Self::rebuild) to populate it.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            index: Mutex::new(HashMap::new()),
        }
    }

    /// Reload every game from the store and replace the index.
    ///
    /// On failure the previous index stays in place. Returns the number of
    /// games indexed.
    pub fn rebuild(&self) -> Result<usize, StoreError> {
        let games = self.store.load_games()?;
        let count = games.len();
        let previous = self.swap_index(build_index(games));
        drop(previous);
        Ok(count)
    }

    /// Install `index` and hand back the one it replaced, unlocked.
    fn swap_index(
        &self,
        index: HashMap<String, Vec<GameEntity>>,
    ) -> HashMap<String, Vec<GameEntity>> {
        let mut guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, index)
    }

    /// Resolve a name to the preferred game carrying it.
    pub fn lookup(&self, name: &str) -> Option<GameEntity> {
        let key = normalize_name(name);
        let current_year = self.clock.now().year();

        let guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&key)?
            .iter()
            .max_by(|a, b| compare_candidates(a, b, current_year))
            .cloned()
    }

    /// All games carrying a name, preferred first.
    pub fn candidates(&self, name: &str) -> Vec<GameEntity> {
        let key = normalize_name(name);
        let current_year = self.clock.now().year();

        let guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        let mut games = guard.get(&key).cloned().unwrap_or_default();
        drop(guard);
        games.sort_by(|a, b| compare_candidates(b, a, current_year));
        games
    }

    /// Number of games indexed.
    pub fn len(&self) -> usize {
        let guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        guard.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: GameStore + 'static> GameCache<S> {
    /// Rebuild immediately and then every `every` until cancelled.
    ///
    /// Rebuilds run on the blocking pool. A failed rebuild is logged and the
    /// previous index keeps serving.
    pub async fn run_periodic(self: Arc<Self>, every: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let cache = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || cache.rebuild()).await {
                Ok(Ok(count)) => log::info!("Indexed {} games by name", count),
                Ok(Err(e)) => log::warn!("Error updating game cache: {}", e),
                Err(e) => log::error!("Game cache rebuild task failed: {}", e),
            }
        }
    }
}
