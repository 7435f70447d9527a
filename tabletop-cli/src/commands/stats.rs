use std::path::PathBuf;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;

pub(crate) fn run_stats(database: Option<PathBuf>) -> Result<(), CliError> {
    let settings = crate::load_settings(database)?;

    if !settings.database.exists() {
        log::warn!("No catalog database found at {}", settings.database.display());
        log::info!("Run 'tabletop crawl' to create one.");
        return Ok(());
    }

    let store = crate::open_store(&settings)?;
    let stats = store
        .stats()
        .map_err(|e| CliError::database(format!("Failed to query catalog stats: {}", e)))?;

    println!(
        "{}",
        "Catalog Database Statistics".if_supports_color(Stdout, |t| t.bold()),
    );
    println!("  Database: {}", settings.database.display());
    println!();
    println!("  Base games:     {:>8}", stats.games);
    println!("  Expansions:     {:>8}", stats.expansions);
    println!("  Families:       {:>8}", stats.families);
    println!();
    println!(
        "  Oldest game refresh:   {}",
        format_refresh(stats.oldest_game_refresh)
    );
    println!(
        "  Oldest family refresh: {}",
        format_refresh(stats.oldest_family_refresh)
    );

    Ok(())
}

fn format_refresh(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => {
            let days = (Utc::now() - at).num_days();
            format!("{} ({} days ago)", at.format("%Y-%m-%d %H:%M"), days)
        }
        None => "never".to_string(),
    }
}
