//! Catalog synchronization: the crawl engine that mirrors the upstream
//! catalog into a store, and the name-resolution cache that reads it back.

pub mod cache;
pub mod crawler;
pub mod frontier;
pub mod progress;
pub mod settings;
pub mod state;

pub use cache::{GameCache, buzz_score, compare_candidates, normalize_name};
pub use crawler::{CrawlError, Crawler, CycleStats, Phase, PhaseStats};
pub use frontier::Frontier;
pub use progress::{CrawlProgress, LogProgress, SilentProgress};
pub use settings::{
    SettingSource, SettingSources, Settings, SettingsError, config_path, default_database_path,
};
pub use state::{CrawlPolicy, CrawlState, DEFAULT_SEED_FAMILY, DEFAULT_SEED_GAMES};
