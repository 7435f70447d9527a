use std::path::PathBuf;
use std::sync::Arc;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use serde::Serialize;
use tabletop_catalog::{GameEntity, SystemClock};
use tabletop_sync::GameCache;

use crate::CliError;

#[derive(Serialize)]
struct LookupResult<'a> {
    query: &'a str,
    game: Option<GameEntity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<GameEntity>,
}

pub(crate) fn run_lookup(
    database: Option<PathBuf>,
    names: &[String],
    json: bool,
    all: bool,
) -> Result<(), CliError> {
    let settings = crate::load_settings(database)?;

    if !settings.database.exists() {
        log::warn!("No catalog database found at {}", settings.database.display());
        log::info!("Run 'tabletop crawl' to create one.");
        return Ok(());
    }

    let store = crate::open_store(&settings)?;
    let cache = GameCache::new(store, Arc::new(SystemClock));
    let indexed = cache
        .rebuild()
        .map_err(|e| CliError::database(format!("Failed to load games: {}", e)))?;
    log::debug!("Indexed {} games", indexed);

    let results: Vec<LookupResult> = names
        .iter()
        .map(|query| LookupResult {
            query,
            game: cache.lookup(query),
            candidates: if all {
                cache.candidates(query)
            } else {
                Vec::new()
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for result in &results {
        match &result.game {
            Some(game) => println!(
                "{} {} {}",
                result.query.if_supports_color(Stdout, |t| t.bold()),
                "->".if_supports_color(Stdout, |t| t.dimmed()),
                describe(game).if_supports_color(Stdout, |t| t.green()),
            ),
            None => println!(
                "{} {} {}",
                result.query.if_supports_color(Stdout, |t| t.bold()),
                "->".if_supports_color(Stdout, |t| t.dimmed()),
                "not found".if_supports_color(Stdout, |t| t.red()),
            ),
        }
        for candidate in result.candidates.iter() {
            println!("    {}", describe(candidate));
        }
    }

    Ok(())
}

fn describe(game: &GameEntity) -> String {
    let year = if game.has_known_year() {
        game.year_published.to_string()
    } else {
        "????".to_string()
    };
    format!(
        "#{} {} ({}, {}) {:.2} avg / {} ratings",
        game.id, game.name, year, game.kind, game.average_rating, game.rating_count
    )
}
