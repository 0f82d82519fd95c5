use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_INTERVAL_MINS: u64 = 60;

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// URL of the festival JSON feed
    pub feed_url: ConfigValue<Option<String>>,
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Path to the bookmarks file
    pub bookmarks_path: ConfigValue<PathBuf>,
    /// Seconds to wait for the feed before giving up
    pub fetch_timeout_secs: ConfigValue<u64>,
    /// Minutes between automatic refreshes
    pub refresh_interval_mins: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    feed_url: Option<String>,
    database_path: Option<PathBuf>,
    bookmarks_path: Option<PathBuf>,
    fetch_timeout_secs: Option<u64>,
    refresh_interval_mins: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut feed_url = ConfigValue::new(None, ConfigSource::Default);
        let mut database_path =
            ConfigValue::new(data_dir.join("beerfest.db"), ConfigSource::Default);
        let mut bookmarks_path =
            ConfigValue::new(data_dir.join("bookmarks.json"), ConfigSource::Default);
        let mut fetch_timeout_secs =
            ConfigValue::new(DEFAULT_FETCH_TIMEOUT_SECS, ConfigSource::Default);
        let mut refresh_interval_mins =
            ConfigValue::new(DEFAULT_REFRESH_INTERVAL_MINS, ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(url) = file_config.feed_url {
                feed_url = ConfigValue::new(Some(url), ConfigSource::File);
            }
            if let Some(db_path) = file_config.database_path {
                database_path = ConfigValue::new(resolve(&path, db_path), ConfigSource::File);
            }
            if let Some(bm_path) = file_config.bookmarks_path {
                bookmarks_path = ConfigValue::new(resolve(&path, bm_path), ConfigSource::File);
            }
            if let Some(secs) = file_config.fetch_timeout_secs {
                fetch_timeout_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            if let Some(mins) = file_config.refresh_interval_mins {
                refresh_interval_mins = ConfigValue::new(mins, ConfigSource::File);
            }

            config_file = Some(path);
        }

        // Apply environment variable overrides
        if let Some(url) = env("BEERFEST_FEED_URL") {
            feed_url = ConfigValue::new(Some(url), ConfigSource::Environment);
        }
        if let Some(db_path) = env("BEERFEST_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(bm_path) = env("BEERFEST_BOOKMARKS_PATH") {
            bookmarks_path = ConfigValue::new(PathBuf::from(bm_path), ConfigSource::Environment);
        }
        if let Some(secs) = env("BEERFEST_FETCH_TIMEOUT_SECS") {
            fetch_timeout_secs = ConfigValue::new(
                parse_number("BEERFEST_FETCH_TIMEOUT_SECS", &secs)?,
                ConfigSource::Environment,
            );
        }
        if let Some(mins) = env("BEERFEST_REFRESH_INTERVAL_MINS") {
            refresh_interval_mins = ConfigValue::new(
                parse_number("BEERFEST_REFRESH_INTERVAL_MINS", &mins)?,
                ConfigSource::Environment,
            );
        }

        if fetch_timeout_secs.value == 0 {
            let var = match fetch_timeout_secs.source {
                ConfigSource::Environment => "BEERFEST_FETCH_TIMEOUT_SECS",
                _ => "fetch_timeout_secs",
            };
            return Err(ConfigError::InvalidValue {
                var: var.to_string(),
                value: "0".to_string(),
                expected: "a timeout of at least 1 second",
            });
        }

        Ok(Self {
            feed_url,
            database_path,
            bookmarks_path,
            fetch_timeout_secs,
            refresh_interval_mins,
            config_file,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.value)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_mins.value.saturating_mul(60))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/beerfest/
    /// - macOS: ~/Library/Application Support/beerfest/
    /// - Windows: %APPDATA%/beerfest/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beerfest")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/beerfest/
    /// - macOS: ~/Library/Application Support/beerfest/
    /// - Windows: %APPDATA%/beerfest/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beerfest")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

fn parse_number(var: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
            expected: "a whole number",
        })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid value '{value}' for {var}: expected {expected}")]
    InvalidValue {
        var: String,
        value: String,
        expected: &'static str,
    },
}
