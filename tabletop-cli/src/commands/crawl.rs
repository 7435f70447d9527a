use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::CliError;

use super::build_crawler;

pub(crate) fn run_crawl(database: Option<PathBuf>) -> Result<(), CliError> {
    let settings = crate::load_settings(database)?;
    let store = crate::open_store(&settings)?;

    log::info!("Crawling into {}", settings.database.display());
    log::info!("Upstream: {}", settings.base_url);

    let rt = crate::runtime()?;
    rt.block_on(async {
        let crawler = build_crawler(&settings, store)?;
        let cancel = CancellationToken::new();
        crate::cancel_on_ctrl_c(cancel.clone());

        crawler.run(cancel).await;
        Ok::<(), CliError>(())
    })
}
