//! tabletop CLI
//!
//! Mirrors the upstream board game catalog into a local database and
//! resolves game names against it.

mod commands;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tabletop_db::SqliteStore;
use tabletop_sync::Settings;
use tokio_util::sync::CancellationToken;

pub(crate) use error::CliError;

#[derive(Parser)]
#[command(name = "tabletop")]
#[command(about = "Mirror and query the board game catalog", long_about = None)]
struct Cli {
    /// Catalog database path (overrides config and environment)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the upstream catalog until interrupted
    Crawl,

    /// Crawl and keep the name cache fresh, answering names read from stdin
    Serve,

    /// Resolve game names against the local catalog
    Lookup {
        /// Names to resolve
        #[arg(required = true)]
        names: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// List every game with the name, preferred first
        #[arg(long)]
        all: bool,
    },

    /// Show catalog database statistics
    Stats,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective settings and their sources
    Show,

    /// Print the config file path
    Path,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Crawl => commands::crawl::run_crawl(cli.database),
        Commands::Serve => commands::serve::run_serve(cli.database),
        Commands::Lookup { names, json, all } => {
            commands::lookup::run_lookup(cli.database, &names, json, all)
        }
        Commands::Stats => commands::stats::run_stats(cli.database),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(cli.database),
            ConfigAction::Path => commands::config::run_config_path(),
        },
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(verbose)
        .init();
}

/// Load settings, applying the `--database` override.
pub(crate) fn load_settings(database: Option<PathBuf>) -> Result<Settings, CliError> {
    Settings::load()
        .map(|s| s.with_database(database))
        .map_err(|e| CliError::config(e.to_string()))
}

/// Open (creating if needed) the catalog database.
pub(crate) fn open_store(settings: &Settings) -> Result<Arc<SqliteStore>, CliError> {
    let store = SqliteStore::open(&settings.database).map_err(|e| {
        CliError::database(format!(
            "Failed to open catalog database {}: {}",
            settings.database.display(),
            e
        ))
    })?;
    Ok(Arc::new(store))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {}", e)))
}

/// Cancel `token` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Interrupted, shutting down");
                token.cancel();
            }
            Err(e) => log::warn!("Could not listen for Ctrl-C: {}", e),
        }
    });
}
