//! SQLite persistence layer for the tabletop catalog.
//!
//! Provides schema creation, upsert and snapshot operations, and a
//! [`SqliteStore`] implementing the catalog's store contracts, backed by
//! SQLite (via rusqlite with bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;
pub mod store;

pub use operations::{OperationError, upsert_family, upsert_game};
pub use queries::{CatalogStats, catalog_stats, load_families, load_games};
pub use schema::{SchemaError, open_database, open_memory};
pub use store::SqliteStore;
