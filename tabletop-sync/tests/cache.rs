mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::*;
use tabletop_catalog::{GameEntity, GameStore, ManualClock, StoreError};
use tabletop_db::SqliteStore;
use tabletop_sync::GameCache;
use tokio_util::sync::CancellationToken;

fn clock_in(year: i32) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap(),
    ))
}

fn store_with(games: &[GameEntity]) -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    for game in games {
        store.upsert_game(game).unwrap();
    }
    store
}

#[test]
fn lookup_ignores_case_and_surrounding_whitespace() {
    let store = store_with(&[game(13, "Catan", &[])]);
    let cache = GameCache::new(store, clock_in(2026));
    assert_eq!(cache.rebuild().unwrap(), 1);

    for query in ["Catan", "catan", "  CATAN\t"] {
        assert_eq!(cache.lookup(query).map(|g| g.id), Some(13), "query {:?}", query);
    }
}

#[test]
fn absent_name_resolves_to_nothing() {
    let store = store_with(&[game(13, "Catan", &[])]);
    let cache = GameCache::new(store, clock_in(2026));
    cache.rebuild().unwrap();

    assert!(cache.lookup("Carcassonne").is_none());
    assert!(cache.lookup("").is_none());
}

#[test]
fn empty_cache_resolves_nothing_until_rebuilt() {
    let store = store_with(&[game(13, "Catan", &[])]);
    let cache = GameCache::new(store, clock_in(2026));

    assert!(cache.is_empty());
    assert!(cache.lookup("Catan").is_none());
    cache.rebuild().unwrap();
    assert_eq!(cache.len(), 1);
}

#[test]
fn popularity_magnitude_then_average_rating() {
    let newer = rated_game(1, "Twilight", 2015, 100_000, 6.0);
    let older = rated_game(2, "Twilight", 1995, 50_000, 8.0);
    let store = store_with(&[newer, older]);

    let clock = clock_in(2016);
    let cache = GameCache::new(store, clock.clone());
    cache.rebuild().unwrap();

    // 100000 per year against about 2380 per year.
    assert_eq!(cache.lookup("twilight").map(|g| g.id), Some(1));

    // Ten years on both sit in the thousands; the better rated one wins.
    clock.set(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
    assert_eq!(cache.lookup("twilight").map(|g| g.id), Some(2));

    let ranked: Vec<_> = cache.candidates("Twilight").iter().map(|g| g.id).collect();
    assert_eq!(ranked, vec![2, 1]);
}

#[test]
fn failed_rebuild_keeps_previous_index() {
    let store = Arc::new(FlakyStore::new());
    store.inner.upsert_game(&game(13, "Catan", &[])).unwrap();
    let cache = GameCache::new(Arc::clone(&store), clock_in(2026));
    cache.rebuild().unwrap();

    store.fail_loads.store(true, Ordering::SeqCst);
    assert!(cache.rebuild().is_err());
    assert_eq!(cache.lookup("catan").map(|g| g.id), Some(13));
}

/// Alternates between a small and a large snapshot on every load.
struct AlternatingStore {
    loads: AtomicUsize,
    small: Vec<GameEntity>,
    large: Vec<GameEntity>,
}

impl GameStore for AlternatingStore {
    fn load_games(&self) -> Result<Vec<GameEntity>, StoreError> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(if n % 2 == 0 {
            self.small.clone()
        } else {
            self.large.clone()
        })
    }

    fn upsert_game(&self, _game: &GameEntity) -> Result<(), StoreError> {
        Ok(())
    }
}

#[test]
fn lookups_never_see_a_partial_rebuild() {
    let all: Vec<GameEntity> = (1..=300)
        .map(|id| game(id, &format!("Game {}", id), &[]))
        .collect();
    let store = AlternatingStore {
        loads: AtomicUsize::new(0),
        small: all[..200].to_vec(),
        large: all,
    };
    let cache = GameCache::new(store, clock_in(2026));
    cache.rebuild().unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                cache.rebuild().unwrap();
            }
        });

        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..500 {
                    let len = cache.len();
                    assert!(len == 200 || len == 300, "saw {} games", len);
                    assert_eq!(cache.lookup("game 7").map(|g| g.id), Some(7));
                }
            });
        }
    });
}

#[tokio::test]
async fn periodic_refresh_picks_up_new_games() {
    let store = store_with(&[]);
    let cache = Arc::new(GameCache::new(Arc::clone(&store), clock_in(2026)));
    let cancel = CancellationToken::new();

    let task = tokio::spawn(
        Arc::clone(&cache).run_periodic(Duration::from_millis(20), cancel.clone()),
    );

    store.upsert_game(&game(13, "Catan", &[])).unwrap();

    let mut found = false;
    for _ in 0..250 {
        if cache.lookup("catan").is_some() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(found, "game never showed up in the cache");

    cancel.cancel();
    task.await.unwrap();
}
