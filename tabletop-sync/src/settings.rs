use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tabletop_bgg::{ClientOptions, DEFAULT_BASE_URL};
use tabletop_catalog::CatalogId;

use crate::state::{CrawlPolicy, DEFAULT_SEED_FAMILY, DEFAULT_SEED_GAMES};

const APP_DIR: &str = "tabletop-catalog";

const ENV_DATABASE: &str = "TABLETOP_DATABASE";
const ENV_BASE_URL: &str = "TABLETOP_BGG_BASE_URL";
const ENV_TOKEN: &str = "TABLETOP_BGG_TOKEN";
const ENV_REQUEST_INTERVAL: &str = "TABLETOP_REQUEST_INTERVAL";
const ENV_FAMILY_STALENESS: &str = "TABLETOP_FAMILY_STALENESS_DAYS";
const ENV_GAME_STALENESS: &str = "TABLETOP_GAME_STALENESS_DAYS";
const ENV_IDLE_HOURS: &str = "TABLETOP_IDLE_HOURS";
const ENV_CACHE_REFRESH: &str = "TABLETOP_CACHE_REFRESH_MINUTES";

const REQUEST_INTERVAL_RANGE: RangeInclusive<u64> = 1..=86_400;
const STALENESS_DAYS_RANGE: RangeInclusive<u32> = 1..=36_500;
const IDLE_HOURS_RANGE: RangeInclusive<u64> = 1..=8_760;
const CACHE_REFRESH_RANGE: RangeInclusive<u64> = 1..=525_600;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where a setting's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Overridden on the command line.
    CommandLine,
    /// Hard-coded default value.
    Default,
    /// Not set anywhere.
    Missing,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::CommandLine => write!(f, "command line"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Provenance of each setting.
#[derive(Debug, Clone)]
pub struct SettingSources {
    pub database: SettingSource,
    pub base_url: SettingSource,
    pub api_token: SettingSource,
    pub request_interval_secs: SettingSource,
    pub family_staleness_days: SettingSource,
    pub game_staleness_days: SettingSource,
    pub idle_hours: SettingSource,
    pub cache_refresh_minutes: SettingSource,
    pub seed_family_ids: SettingSource,
    pub seed_game_ids: SettingSource,
}

/// TOML config file format.
#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    sync: Option<SyncConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct SyncConfig {
    database: Option<PathBuf>,
    base_url: Option<String>,
    api_token: Option<String>,
    request_interval_secs: Option<u64>,
    family_staleness_days: Option<u32>,
    game_staleness_days: Option<u32>,
    idle_hours: Option<u64>,
    cache_refresh_minutes: Option<u64>,
    seed_family_ids: Option<Vec<CatalogId>>,
    seed_game_ids: Option<Vec<CatalogId>>,
}

/// Effective runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_interval_secs: u64,
    pub family_staleness_days: u32,
    pub game_staleness_days: u32,
    pub idle_hours: u64,
    pub cache_refresh_minutes: u64,
    pub seed_family_ids: Vec<CatalogId>,
    pub seed_game_ids: Vec<CatalogId>,
    pub sources: SettingSources,
}

impl Settings {
    /// Load settings from environment variables, the config file, or defaults.
    ///
    /// Priority: env vars > config file > defaults. A missing config file is
    /// not an error; an unreadable or invalid one is.
    pub fn load() -> Result<Self, SettingsError> {
        let file = match config_path() {
            Some(path) => read_config_file(&path)?,
            None => None,
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve(
        file: Option<SyncConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let file = file.unwrap_or_default();

        let (database, database_src) =
            layered(ENV_DATABASE, &env, file.database, default_database_path)?;
        let (base_url, base_url_src) =
            layered(ENV_BASE_URL, &env, file.base_url, || DEFAULT_BASE_URL.to_string())?;
        let (request_interval_secs, request_interval_src) =
            layered(ENV_REQUEST_INTERVAL, &env, file.request_interval_secs, || 5)?;
        let (family_staleness_days, family_staleness_src) =
            layered(ENV_FAMILY_STALENESS, &env, file.family_staleness_days, || 4)?;
        let (game_staleness_days, game_staleness_src) =
            layered(ENV_GAME_STALENESS, &env, file.game_staleness_days, || 28)?;
        let (idle_hours, idle_hours_src) = layered(ENV_IDLE_HOURS, &env, file.idle_hours, || 4)?;
        let (cache_refresh_minutes, cache_refresh_src) =
            layered(ENV_CACHE_REFRESH, &env, file.cache_refresh_minutes, || 60)?;

        let request_interval_secs = check_range(
            "request_interval_secs",
            request_interval_secs,
            REQUEST_INTERVAL_RANGE,
        )?;
        let family_staleness_days = check_range(
            "family_staleness_days",
            family_staleness_days,
            STALENESS_DAYS_RANGE,
        )?;
        let game_staleness_days =
            check_range("game_staleness_days", game_staleness_days, STALENESS_DAYS_RANGE)?;
        let idle_hours = check_range("idle_hours", idle_hours, IDLE_HOURS_RANGE)?;
        let cache_refresh_minutes = check_range(
            "cache_refresh_minutes",
            cache_refresh_minutes,
            CACHE_REFRESH_RANGE,
        )?;

        let (api_token, api_token_src) = match env(ENV_TOKEN) {
            Some(token) => (Some(token), SettingSource::EnvVar(ENV_TOKEN)),
            None => match file.api_token {
                Some(token) => (Some(token), SettingSource::ConfigFile),
                None => (None, SettingSource::Missing),
            },
        };

        let (seed_family_ids, seed_family_src) = match file.seed_family_ids {
            Some(ids) => (ids, SettingSource::ConfigFile),
            None => (vec![DEFAULT_SEED_FAMILY], SettingSource::Default),
        };
        let (seed_game_ids, seed_game_src) = match file.seed_game_ids {
            Some(ids) => (ids, SettingSource::ConfigFile),
            None => (DEFAULT_SEED_GAMES.to_vec(), SettingSource::Default),
        };

        Ok(Self {
            database,
            base_url,
            api_token,
            request_interval_secs,
            family_staleness_days,
            game_staleness_days,
            idle_hours,
            cache_refresh_minutes,
            seed_family_ids,
            seed_game_ids,
            sources: SettingSources {
                database: database_src,
                base_url: base_url_src,
                api_token: api_token_src,
                request_interval_secs: request_interval_src,
                family_staleness_days: family_staleness_src,
                game_staleness_days: game_staleness_src,
                idle_hours: idle_hours_src,
                cache_refresh_minutes: cache_refresh_src,
                seed_family_ids: seed_family_src,
                seed_game_ids: seed_game_src,
            },
        })
    }

    /// Replace the database path (e.g., from a CLI flag).
    pub fn with_database(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database = path;
            self.sources.database = SettingSource::CommandLine;
        }
        self
    }

    pub fn crawl_policy(&self) -> CrawlPolicy {
        CrawlPolicy {
            family_staleness: chrono::Duration::days(i64::from(self.family_staleness_days)),
            game_staleness: chrono::Duration::days(i64::from(self.game_staleness_days)),
            idle_interval: Duration::from_secs(self.idle_hours * 60 * 60),
            seed_family_ids: self.seed_family_ids.clone(),
            seed_game_ids: self.seed_game_ids.clone(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            api_token: self.api_token.clone(),
            request_interval: Duration::from_secs(self.request_interval_secs),
        }
    }

    pub fn cache_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache_refresh_minutes * 60)
    }

    /// Every setting as `(key, display value, source)`, for `config show`.
    /// The API token is masked.
    pub fn entries(&self) -> Vec<(&'static str, String, &SettingSource)> {
        let s = &self.sources;
        vec![
            ("database", self.database.display().to_string(), &s.database),
            ("base_url", self.base_url.clone(), &s.base_url),
            (
                "api_token",
                self.api_token
                    .as_deref()
                    .map(mask)
                    .unwrap_or_else(|| "-".to_string()),
                &s.api_token,
            ),
            (
                "request_interval_secs",
                self.request_interval_secs.to_string(),
                &s.request_interval_secs,
            ),
            (
                "family_staleness_days",
                self.family_staleness_days.to_string(),
                &s.family_staleness_days,
            ),
            (
                "game_staleness_days",
                self.game_staleness_days.to_string(),
                &s.game_staleness_days,
            ),
            ("idle_hours", self.idle_hours.to_string(), &s.idle_hours),
            (
                "cache_refresh_minutes",
                self.cache_refresh_minutes.to_string(),
                &s.cache_refresh_minutes,
            ),
            ("seed_family_ids", join_ids(&self.seed_family_ids), &s.seed_family_ids),
            ("seed_game_ids", join_ids(&self.seed_game_ids), &s.seed_game_ids),
        ]
    }
}

/// Return the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Default catalog database location, falling back to the working directory
/// when no data directory is known.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catalog.db")
}

fn read_config_file(path: &Path) -> Result<Option<SyncConfig>, SettingsError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config: ConfigFile = toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config.sync)
}

/// Resolve one value: env var, then config file, then default.
fn layered<T>(
    key: &'static str,
    env: &impl Fn(&str) -> Option<String>,
    file: Option<T>,
    default: impl FnOnce() -> T,
) -> Result<(T, SettingSource), SettingsError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(raw) = env(key) {
        let value = raw
            .trim()
            .parse::<T>()
            .map_err(|e| SettingsError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
        return Ok((value, SettingSource::EnvVar(key)));
    }
    match file {
        Some(value) => Ok((value, SettingSource::ConfigFile)),
        None => Ok((default(), SettingSource::Default)),
    }
}

fn check_range<T>(key: &'static str, value: T, range: RangeInclusive<T>) -> Result<T, SettingsError>
where
    T: PartialOrd + fmt::Display,
{
    if range.contains(&value) {
        return Ok(value);
    }
    Err(SettingsError::InvalidValue {
        key,
        value: value.to_string(),
        reason: format!("must be between {} and {}", range.start(), range.end()),
    })
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{}…", visible)
}

fn join_ids(ids: &[CatalogId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
