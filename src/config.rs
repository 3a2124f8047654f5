//! Configuration module for newsfeed.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::news::{
    FeedDescriptor, LifetimeSetting, DEFAULT_REFRESH_MINUTES, MAX_FEED_SIZE, MAX_ITEMS_PER_FEED,
};
use crate::{NewsError, Result};

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "NEWSFEED_DATABASE_URL";

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. The scheme selects the backend (`sqlite:` or `postgres:`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/news.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_db_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Feed download configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum items taken from one feed document.
    #[serde(default = "default_max_items")]
    pub max_items_per_feed: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("newsfeed/", env!("CARGO_PKG_VERSION"), " (RSS Reader)").to_string()
}

fn default_max_items() -> usize {
    MAX_ITEMS_PER_FEED
}

fn default_max_feed_size() -> u64 {
    MAX_FEED_SIZE
}

fn default_max_redirects() -> usize {
    5
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_items_per_feed: default_max_items(),
            max_feed_size_bytes: default_max_feed_size(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Update cycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfig {
    /// Refresh interval for feeds that do not set `refresh`.
    #[serde(default = "default_refresh_minutes")]
    pub default_refresh_minutes: i64,
}

fn default_refresh_minutes() -> i64 {
    DEFAULT_REFRESH_MINUTES
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            default_refresh_minutes: default_refresh_minutes(),
        }
    }
}

/// One configured feed, as written in TOML or the JSON feed list.
///
/// Every field is optional here; [`Config::feed_descriptors`] decides what is
/// usable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Refresh interval in minutes. `cache` is accepted for older feed lists.
    #[serde(default, alias = "cache")]
    pub refresh: Option<toml::Value>,
    /// Retention in days. Absent or non-positive keeps articles forever.
    #[serde(default)]
    pub lifetime: Option<toml::Value>,
}

/// JSON feed list (`{"feeds": [...]}`).
#[derive(Debug, Deserialize)]
struct FeedList {
    #[serde(default)]
    feeds: Vec<FeedConfig>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Update cycle configuration.
    #[serde(default)]
    pub update: UpdateConfig,
    /// Inline feed definitions.
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    /// Optional JSON feed list, appended after the inline feeds.
    #[serde(default)]
    pub feeds_file: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A relative `feeds_file` is resolved against the config file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(NewsError::Io)?;
        let mut config = Self::parse(&content)?;

        if let Some(feeds_file) = config.feeds_file.clone() {
            let mut list_path = PathBuf::from(&feeds_file);
            if list_path.is_relative() {
                if let Some(dir) = path.parent() {
                    list_path = dir.join(list_path);
                }
            }
            config.feeds.extend(load_feed_list(&list_path)?);
        }

        Ok(config)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NewsError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `NEWSFEED_DATABASE_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        crate::db::DatabaseBackend::from_url(&self.database.url)?;
        if self.fetch.timeout_secs == 0 {
            return Err(NewsError::Config(
                "fetch.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.fetch.max_items_per_feed == 0 {
            return Err(NewsError::Config(
                "fetch.max_items_per_feed must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Turn the configured feed entries into descriptors, in order.
    ///
    /// Entries without `id` or `url` and repeated ids are skipped with a warning.
    pub fn feed_descriptors(&self) -> Vec<FeedDescriptor> {
        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(self.feeds.len());

        for (index, feed) in self.feeds.iter().enumerate() {
            let id = feed.id.as_deref().map(str::trim).unwrap_or_default();
            let url = feed.url.as_deref().map(str::trim).unwrap_or_default();
            if id.is_empty() || url.is_empty() {
                warn!(
                    "Skipping feed entry #{}: missing {}",
                    index + 1,
                    if id.is_empty() { "id" } else { "url" }
                );
                continue;
            }
            if !seen.insert(id.to_string()) {
                warn!("Skipping feed entry #{}: duplicate id '{}'", index + 1, id);
                continue;
            }

            let refresh_minutes = match feed.refresh.as_ref() {
                None => self.update.default_refresh_minutes,
                Some(value) => match numeric_value(value) {
                    Some(minutes) => (minutes.round() as i64).max(0),
                    None => {
                        warn!(
                            "Feed {}: refresh '{}' is not a number; using {} minutes",
                            id, value, self.update.default_refresh_minutes
                        );
                        self.update.default_refresh_minutes
                    }
                },
            };

            descriptors.push(FeedDescriptor {
                id: id.to_string(),
                url: url.to_string(),
                name: feed.name.clone(),
                refresh_minutes,
                lifetime: lifetime_setting(feed.lifetime.as_ref()),
            });
        }

        descriptors
    }
}

/// Read a JSON feed list.
pub fn load_feed_list<P: AsRef<Path>>(path: P) -> Result<Vec<FeedConfig>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(NewsError::Io)?;
    let list: FeedList = serde_json::from_str(&content).map_err(|e| {
        NewsError::Config(format!("feed list parse error in {}: {e}", path.display()))
    })?;
    Ok(list.feeds)
}

fn numeric_value(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::Float(f) if !f.is_nan() => Some(*f),
        toml::Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
        _ => None,
    }
}

fn lifetime_setting(value: Option<&toml::Value>) -> LifetimeSetting {
    match value {
        None => LifetimeSetting::Unset,
        Some(v) => match numeric_value(v) {
            Some(days) => LifetimeSetting::Days(days),
            None => LifetimeSetting::Invalid(match v {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        },
    }
}
