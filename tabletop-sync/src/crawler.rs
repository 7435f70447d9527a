//! The crawl engine: alternating game and family expansion passes over the
//! upstream catalog, persisting every entity it fetches.
//!
//! One cycle runs the game phase then the family phase. The game phase
//! drains the game frontier and queues every family it sees; the family
//! phase drains the family frontier and queues every member game. A cycle
//! that attempts no fetches is idle: the crawler sleeps, then restarts from
//! the persisted snapshot.
//!
//! Store writes are synchronous and happen inline on the crawl task. Work
//! that must stay responsive while a write waits on the connection, such as
//! answering lookups, runs on its own task.

use std::fmt;
use std::sync::Arc;

use tabletop_bgg::{CatalogSource, FetchError};
use tabletop_catalog::{CatalogId, Clock, FamilyStore, GameStore, is_stale};
use tokio_util::sync::CancellationToken;

use crate::progress::{CrawlProgress, LogProgress};
use crate::state::{CrawlPolicy, CrawlState};

/// Which half of a cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ExpandingGames,
    ExpandingFamilies,
}

impl Phase {
    fn next(self) -> Option<Phase> {
        match self {
            Phase::ExpandingGames => Some(Phase::ExpandingFamilies),
            Phase::ExpandingFamilies => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::ExpandingGames => write!(f, "Expanding games"),
            Phase::ExpandingFamilies => write!(f, "Expanding families"),
        }
    }
}

/// Counters for one phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStats {
    /// Ids taken from the frontier.
    pub visited: usize,
    /// Ids skipped because the known entity is still fresh.
    pub fresh: usize,
    /// Fetch attempts, successful or not.
    pub fetched: usize,
    /// Entities written to the store.
    pub stored: usize,
    pub not_found: usize,
    pub upstream_failures: usize,
    pub malformed: usize,
    pub store_failures: usize,
}

/// Counters for one full cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub games: PhaseStats,
    pub families: PhaseStats,
}

impl CycleStats {
    /// A cycle is idle when it attempted no fetches at all.
    pub fn is_idle(&self) -> bool {
        self.games.fetched == 0 && self.families.fetched == 0
    }
}

/// Errors that end a crawl pass early.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("crawl cancelled")]
    Cancelled,
}

/// Drives the crawl against a catalog source and a store.
pub struct Crawler<C, S> {
    source: C,
    store: S,
    clock: Arc<dyn Clock>,
    policy: CrawlPolicy,
    progress: Box<dyn CrawlProgress>,
}

impl<C, S> Crawler<C, S>
where
    C: CatalogSource,
    S: GameStore + FamilyStore,
{
    pub fn new(source: C, store: S, clock: Arc<dyn Clock>, policy: CrawlPolicy) -> Self {
        Self {
            source,
            store,
            clock,
            policy,
            progress: Box::new(LogProgress),
        }
    }

    /// Replace the progress reporter.
    pub fn with_progress(mut self, progress: impl CrawlProgress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn policy(&self) -> &CrawlPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the starting state from the store. A snapshot that cannot be
    /// read is treated as empty so the crawl can still start from the seeds.
    pub fn load_state(&self) -> CrawlState {
        let games = self.store.load_games().unwrap_or_else(|e| {
            log::warn!("Could not load games, starting without them: {}", e);
            Vec::new()
        });
        let families = self.store.load_families().unwrap_or_else(|e| {
            log::warn!("Could not load families, starting without them: {}", e);
            Vec::new()
        });
        log::info!(
            "Loaded {} games and {} families from the catalog",
            games.len(),
            families.len()
        );
        CrawlState::from_snapshot(games, families, &self.policy)
    }

    /// Drain the game frontier, fetching unknown and stale games and queueing
    /// the families of every game visited.
    pub async fn expand_games(
        &self,
        state: &mut CrawlState,
        cancel: &CancellationToken,
    ) -> Result<PhaseStats, CrawlError> {
        let phase = Phase::ExpandingGames;
        let now = self.clock.now();
        let order = state.game_frontier.take().partition_unknown(&state.games);
        let total = order.len();
        let mut stats = PhaseStats::default();
        self.progress.on_phase(phase, total);

        for (index, id) in order.into_iter().enumerate() {
            stats.visited += 1;

            if let Some(game) = state.games.get(&id)
                && !is_stale(game.refreshed_at, self.policy.game_staleness, now)
            {
                state.family_frontier.extend(game.family_ids.iter().copied());
                stats.fresh += 1;
                self.progress.on_item(phase, index + 1, total);
                continue;
            }

            stats.fetched += 1;
            match self.source.fetch_game(id, cancel).await {
                Ok(mut game) => {
                    game.refreshed_at = Some(self.clock.now());
                    state.family_frontier.extend(game.family_ids.iter().copied());
                    match self.store.upsert_game(&game) {
                        Ok(()) => {
                            log::debug!("Stored game {} ({})", game.id, game.name);
                            stats.stored += 1;
                            state.games.insert(game.id, game);
                        }
                        Err(e) => {
                            log::warn!("Error storing game {}: {}", id, e);
                            stats.store_failures += 1;
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(CrawlError::Cancelled),
                Err(e) => record_fetch_failure(&mut stats, "game", id, &e),
            }
            self.progress.on_item(phase, index + 1, total);
        }

        Ok(stats)
    }

    /// Drain the family frontier, fetching unknown and stale families and
    /// queueing the members of every family visited. The game frontier is
    /// rebuilt from scratch here.
    pub async fn expand_families(
        &self,
        state: &mut CrawlState,
        cancel: &CancellationToken,
    ) -> Result<PhaseStats, CrawlError> {
        let phase = Phase::ExpandingFamilies;
        let now = self.clock.now();
        let order = state.family_frontier.take().partition_unknown(&state.families);
        state.game_frontier.clear();
        let total = order.len();
        let mut stats = PhaseStats::default();
        self.progress.on_phase(phase, total);

        for (index, id) in order.into_iter().enumerate() {
            stats.visited += 1;

            if let Some(family) = state.families.get(&id)
                && !is_stale(family.refreshed_at, self.policy.family_staleness, now)
            {
                state.game_frontier.extend(family.game_ids.iter().copied());
                stats.fresh += 1;
                self.progress.on_item(phase, index + 1, total);
                continue;
            }

            stats.fetched += 1;
            match self.source.fetch_family(id, cancel).await {
                Ok(mut family) => {
                    family.refreshed_at = Some(self.clock.now());
                    state.game_frontier.extend(family.game_ids.iter().copied());
                    match self.store.upsert_family(&family) {
                        Ok(()) => {
                            log::debug!(
                                "Stored family {} ({}) with {} games",
                                family.id,
                                family.name,
                                family.game_ids.len()
                            );
                            stats.stored += 1;
                            state.families.insert(family.id, family);
                        }
                        Err(e) => {
                            log::warn!("Error storing family {}: {}", id, e);
                            stats.store_failures += 1;
                        }
                    }
                }
                Err(e) if e.is_fatal() => return Err(CrawlError::Cancelled),
                Err(e) => record_fetch_failure(&mut stats, "family", id, &e),
            }
            self.progress.on_item(phase, index + 1, total);
        }

        Ok(stats)
    }

    /// Run one game phase followed by one family phase.
    pub async fn run_cycle(
        &self,
        state: &mut CrawlState,
        cancel: &CancellationToken,
    ) -> Result<CycleStats, CrawlError> {
        self.progress.on_cycle_start(state);

        let mut stats = CycleStats::default();
        let mut phase = Some(Phase::ExpandingGames);
        while let Some(current) = phase {
            match current {
                Phase::ExpandingGames => stats.games = self.expand_games(state, cancel).await?,
                Phase::ExpandingFamilies => {
                    stats.families = self.expand_families(state, cancel).await?
                }
            }
            phase = current.next();
        }

        self.progress.on_cycle_complete(&stats);
        Ok(stats)
    }

    /// Crawl until cancelled.
    ///
    /// Cycles repeat while they do work. After an idle cycle the crawler
    /// sleeps for the policy's idle interval, then reloads the snapshot so
    /// entities that went stale in the meantime are revisited.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let mut state = self.load_state();

            loop {
                match self.run_cycle(&mut state, &cancel).await {
                    Ok(stats) if stats.is_idle() => break,
                    Ok(_) => {}
                    Err(CrawlError::Cancelled) => {
                        log::info!("Crawl cancelled");
                        return;
                    }
                }
            }

            log::info!(
                "No updates needed, sleeping for {} minutes",
                self.policy.idle_interval.as_secs() / 60
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Crawl cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.policy.idle_interval) => {}
            }
        }
    }
}

fn record_fetch_failure(stats: &mut PhaseStats, kind: &str, id: CatalogId, err: &FetchError) {
    match err {
        FetchError::NotACatalogEntry { .. } => {
            log::debug!("Skipping {} {}: {}", kind, id, err);
            stats.not_found += 1;
        }
        FetchError::MalformedPayload(_) => {
            log::error!("Could not decode {} {}: {}", kind, id, err);
            stats.malformed += 1;
        }
        FetchError::UpstreamUnavailable(_) | FetchError::Cancelled => {
            log::warn!("Error fetching {} {}: {}", kind, id, err);
            stats.upstream_failures += 1;
        }
    }
}
