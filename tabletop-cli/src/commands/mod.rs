pub(crate) mod config;
pub(crate) mod crawl;
pub(crate) mod lookup;
pub(crate) mod serve;
pub(crate) mod stats;

use std::sync::Arc;

use tabletop_bgg::BggClient;
use tabletop_catalog::SystemClock;
use tabletop_db::SqliteStore;
use tabletop_sync::{Crawler, Settings};

use crate::CliError;

pub(crate) type CatalogCrawler = Crawler<BggClient, Arc<SqliteStore>>;

/// Build a crawler over the live upstream service.
pub(crate) fn build_crawler(
    settings: &Settings,
    store: Arc<SqliteStore>,
) -> Result<CatalogCrawler, CliError> {
    let client = BggClient::new(settings.client_options())
        .map_err(|e| CliError::upstream(format!("Failed to create HTTP client: {}", e)))?;
    Ok(Crawler::new(
        client,
        store,
        Arc::new(SystemClock),
        settings.crawl_policy(),
    ))
}
