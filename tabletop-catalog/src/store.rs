//! Persistence contracts consumed by the crawler and the resolution cache.

use thiserror::Error;

use crate::types::{FamilyEntity, GameEntity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Storage for game entities.
///
/// `upsert_game` is an idempotent create-or-replace keyed by the external id.
/// The stored family-id set must equal the one passed in, never a union with
/// a prior value.
pub trait GameStore: Send + Sync {
    fn load_games(&self) -> Result<Vec<GameEntity>, StoreError>;
    fn upsert_game(&self, game: &GameEntity) -> Result<(), StoreError>;
}

/// Storage for family entities. Same replacement semantics as [`GameStore`].
pub trait FamilyStore: Send + Sync {
    fn load_families(&self) -> Result<Vec<FamilyEntity>, StoreError>;
    fn upsert_family(&self, family: &FamilyEntity) -> Result<(), StoreError>;
}

impl<T: GameStore + ?Sized> GameStore for std::sync::Arc<T> {
    fn load_games(&self) -> Result<Vec<GameEntity>, StoreError> {
        (**self).load_games()
    }

    fn upsert_game(&self, game: &GameEntity) -> Result<(), StoreError> {
        (**self).upsert_game(game)
    }
}

impl<T: FamilyStore + ?Sized> FamilyStore for std::sync::Arc<T> {
    fn load_families(&self) -> Result<Vec<FamilyEntity>, StoreError> {
        (**self).load_families()
    }

    fn upsert_family(&self, family: &FamilyEntity) -> Result<(), StoreError> {
        (**self).upsert_family(family)
    }
}
