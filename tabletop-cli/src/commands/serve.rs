use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tabletop_catalog::SystemClock;
use tabletop_db::SqliteStore;
use tabletop_sync::GameCache;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::CliError;

use super::build_crawler;

type NameCache = GameCache<Arc<SqliteStore>>;

pub(crate) fn run_serve(database: Option<PathBuf>) -> Result<(), CliError> {
    let settings = crate::load_settings(database)?;
    let store = crate::open_store(&settings)?;

    log::info!("Serving catalog from {}", settings.database.display());
    log::info!(
        "Name cache refreshes every {} minutes",
        settings.cache_refresh_minutes
    );

    let rt = crate::runtime()?;
    let result = rt.block_on(async {
        let crawler = build_crawler(&settings, Arc::clone(&store))?;
        let cache = Arc::new(GameCache::new(store, Arc::new(SystemClock)));
        let cancel = CancellationToken::new();
        crate::cancel_on_ctrl_c(cancel.clone());

        // Lookups and rebuilds run on worker threads, off the crawler's task.
        let refresher = tokio::spawn(
            Arc::clone(&cache).run_periodic(settings.cache_refresh_interval(), cancel.clone()),
        );
        let responder = spawn_responder(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            Arc::clone(&cache),
            cancel.clone(),
        );

        crawler.run(cancel.clone()).await;
        cancel.cancel();

        for (task, handle) in [("cache refresh", refresher), ("lookup", responder)] {
            if let Err(e) = handle.await {
                log::warn!("The {} task ended abnormally: {}", task, e);
            }
        }
        Ok::<(), CliError>(())
    });

    // The stdin reader sits on a blocking thread that never sees the cancel.
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Answer lookups from `input` on their own task until cancelled or the
/// input closes.
fn spawn_responder<R, W>(
    input: R,
    output: W,
    cache: Arc<NameCache>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(answer_lookups(input, output, cache, cancel))
}

/// Resolve each input line, writing `name<TAB>id<TAB>canonical name`.
async fn answer_lookups<R, W>(input: R, mut output: W, cache: Arc<NameCache>, cancel: CancellationToken)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        let reply = match line {
            Ok(Some(query)) => {
                let query = query.trim();
                if query.is_empty() {
                    continue;
                }
                match cache.lookup(query) {
                    Some(game) => format!("{}\t{}\t{}\n", query, game.id, game.name),
                    None => format!("{}\t-\n", query),
                }
            }
            Ok(None) => {
                log::debug!("Input closed, no longer answering lookups");
                return;
            }
            Err(e) => {
                log::warn!("Error reading lookups: {}", e);
                return;
            }
        };

        let written = match output.write_all(reply.as_bytes()).await {
            Ok(()) => output.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            log::warn!("Error writing lookup reply: {}", e);
            return;
        }
    }
}
