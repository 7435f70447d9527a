#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use tabletop_bgg::{CatalogSource, FetchError};
use tabletop_catalog::{
    CatalogId, FamilyEntity, FamilyStore, GameEntity, GameKind, GameStore, ManualClock, StoreError,
};
use tabletop_db::SqliteStore;
use tokio_util::sync::CancellationToken;

/// What the fake upstream answers for an id.
#[derive(Clone)]
pub enum Reply<T> {
    Found(T),
    NotFound,
    Unavailable,
    Malformed,
}

#[derive(Default)]
struct Catalog {
    games: HashMap<CatalogId, Reply<GameEntity>>,
    families: HashMap<CatalogId, Reply<FamilyEntity>>,
}

/// Scripted upstream that records every request.
#[derive(Default, Clone)]
pub struct FakeSource {
    catalog: Arc<Mutex<Catalog>>,
    calls: Arc<Mutex<Vec<(&'static str, CatalogId)>>>,
    cancel_after: Arc<Mutex<Option<(usize, CancellationToken)>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_game(&self, id: CatalogId, reply: Reply<GameEntity>) {
        self.catalog.lock().unwrap().games.insert(id, reply);
    }

    pub fn set_family(&self, id: CatalogId, reply: Reply<FamilyEntity>) {
        self.catalog.lock().unwrap().families.insert(id, reply);
    }

    pub fn add_game(&self, game: GameEntity) {
        self.set_game(game.id, Reply::Found(game));
    }

    pub fn add_family(&self, family: FamilyEntity) {
        self.set_family(family.id, Reply::Found(family));
    }

    pub fn calls(&self) -> Vec<(&'static str, CatalogId)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn game_calls(&self) -> Vec<CatalogId> {
        self.calls_of("game")
    }

    pub fn family_calls(&self) -> Vec<CatalogId> {
        self.calls_of("family")
    }

    fn calls_of(&self, kind: &str) -> Vec<CatalogId> {
        self.calls()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Fire `token` once `limit` requests have been answered.
    pub fn cancel_after(&self, limit: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((limit, token));
    }

    fn record(&self, kind: &'static str, id: CatalogId) {
        let mut calls = self.calls.lock().unwrap();
        calls.push((kind, id));
        if let Some((limit, token)) = &*self.cancel_after.lock().unwrap()
            && calls.len() >= *limit
        {
            token.cancel();
        }
    }
}

fn answer<T: Clone>(reply: Option<Reply<T>>, kind: &'static str, id: CatalogId) -> Result<T, FetchError> {
    match reply {
        Some(Reply::Found(entity)) => Ok(entity),
        Some(Reply::NotFound) | None => Err(FetchError::NotACatalogEntry { kind, id }),
        Some(Reply::Unavailable) => Err(FetchError::UpstreamUnavailable("scripted outage".into())),
        Some(Reply::Malformed) => Err(FetchError::MalformedPayload("scripted garbage".into())),
    }
}

impl CatalogSource for FakeSource {
    async fn fetch_game(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<GameEntity, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.record("game", id);
        let reply = self.catalog.lock().unwrap().games.get(&id).cloned();
        answer(reply, "game", id)
    }

    async fn fetch_family(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<FamilyEntity, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.record("family", id);
        let reply = self.catalog.lock().unwrap().families.get(&id).cloned();
        answer(reply, "family", id)
    }
}

/// SQLite store whose game writes can be switched off.
pub struct FlakyStore {
    pub inner: SqliteStore,
    pub fail_games: AtomicBool,
    pub fail_loads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            fail_games: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_games.store(failing, Ordering::SeqCst);
    }
}

impl GameStore for FlakyStore {
    fn load_games(&self) -> Result<Vec<GameEntity>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("database locked"));
        }
        self.inner.load_games()
    }

    fn upsert_game(&self, game: &GameEntity) -> Result<(), StoreError> {
        if self.fail_games.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("disk full"));
        }
        self.inner.upsert_game(game)
    }
}

impl FamilyStore for FlakyStore {
    fn load_families(&self) -> Result<Vec<FamilyEntity>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("database locked"));
        }
        self.inner.load_families()
    }

    fn upsert_family(&self, family: &FamilyEntity) -> Result<(), StoreError> {
        self.inner.upsert_family(family)
    }
}

pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

pub fn game(id: CatalogId, name: &str, families: &[CatalogId]) -> GameEntity {
    GameEntity {
        id,
        name: name.to_string(),
        kind: GameKind::BaseGame,
        family_ids: families.iter().copied().collect(),
        rating_count: 100,
        average_rating: 7.0,
        year_published: 2010,
        refreshed_at: None,
    }
}

pub fn rated_game(
    id: CatalogId,
    name: &str,
    year: i32,
    rating_count: u32,
    average_rating: f64,
) -> GameEntity {
    GameEntity {
        year_published: year,
        rating_count,
        average_rating,
        ..game(id, name, &[])
    }
}

pub fn family(id: CatalogId, name: &str, games: &[CatalogId]) -> FamilyEntity {
    FamilyEntity {
        id,
        name: name.to_string(),
        game_ids: games.iter().copied().collect::<BTreeSet<_>>(),
        refreshed_at: None,
    }
}
