//! Crawl progress reporting.

use crate::crawler::{CycleStats, Phase};
use crate::state::CrawlState;

/// Trait for receiving crawl progress updates.
pub trait CrawlProgress: Send + Sync {
    /// Called before each cycle with the state it starts from.
    fn on_cycle_start(&self, state: &CrawlState);

    /// Called when a phase starts with the number of ids it will visit.
    fn on_phase(&self, phase: Phase, queued: usize);

    /// Called after each id is visited.
    fn on_item(&self, phase: Phase, current: usize, total: usize);

    /// Called when a cycle finishes.
    fn on_cycle_complete(&self, stats: &CycleStats);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn on_cycle_start(&self, _state: &CrawlState) {}
    fn on_phase(&self, _phase: Phase, _queued: usize) {}
    fn on_item(&self, _phase: Phase, _current: usize, _total: usize) {}
    fn on_cycle_complete(&self, _stats: &CycleStats) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl CrawlProgress for LogProgress {
    fn on_cycle_start(&self, state: &CrawlState) {
        log::info!(
            "Processing backlog: {} games, {} families ({} games and {} families known)",
            state.game_frontier.len(),
            state.family_frontier.len(),
            state.games.len(),
            state.families.len()
        );
    }

    fn on_phase(&self, phase: Phase, queued: usize) {
        log::info!("{}: {} queued", phase, queued);
    }

    fn on_item(&self, phase: Phase, current: usize, total: usize) {
        if current.is_multiple_of(100) || current == total {
            log::info!("  [{}/{}] {}", current, total, phase);
        }
    }

    fn on_cycle_complete(&self, stats: &CycleStats) {
        log::info!(
            "Cycle complete: {} games fetched ({} stored), {} families fetched ({} stored)",
            stats.games.fetched,
            stats.games.stored,
            stats.families.fetched,
            stats.families.stored
        );
    }
}
