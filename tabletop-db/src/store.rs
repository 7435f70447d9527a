//! [`GameStore`] / [`FamilyStore`] implementation over a single SQLite connection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tabletop_catalog::{FamilyEntity, FamilyStore, GameEntity, GameStore, StoreError};

use crate::operations::{self, OperationError};
use crate::queries::{self, CatalogStats};
use crate::schema::{self, SchemaError};

/// A catalog store backed by SQLite.
///
/// `Connection` is `Send` but not `Sync`, so access is serialized through a
/// mutex. Statements are short-lived; callers on an async runtime should still
/// run them via `spawn_blocking` when latency matters.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, SchemaError> {
        Ok(Self::from_connection(schema::open_database(path)?))
    }

    /// An in-memory store with the full schema. Useful for testing.
    pub fn in_memory() -> Result<Self, SchemaError> {
        Ok(Self::from_connection(schema::open_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn stats(&self) -> Result<CatalogStats, OperationError> {
        queries::catalog_stats(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves the connection usable; SQLite rolls back
        // the open transaction when it is dropped.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl From<OperationError> for StoreError {
    fn from(e: OperationError) -> Self {
        StoreError::unavailable(e.to_string())
    }
}

impl GameStore for SqliteStore {
    fn load_games(&self) -> Result<Vec<GameEntity>, StoreError> {
        Ok(queries::load_games(&self.lock())?)
    }

    fn upsert_game(&self, game: &GameEntity) -> Result<(), StoreError> {
        Ok(operations::upsert_game(&self.lock(), game)?)
    }
}

impl FamilyStore for SqliteStore {
    fn load_families(&self) -> Result<Vec<FamilyEntity>, StoreError> {
        Ok(queries::load_families(&self.lock())?)
    }

    fn upsert_family(&self, family: &FamilyEntity) -> Result<(), StoreError> {
        Ok(operations::upsert_family(&self.lock(), family)?)
    }
}
