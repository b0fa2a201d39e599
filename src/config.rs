use crate::error::ConfigError;
use crate::sync::preferences::FILTER_PREFERENCES_FILE;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub page_size: u32,
    pub search_debounce: Duration,
    pub virtualize_threshold: u64,
    pub stale_after: Duration,
    /// JSON file of property records served from memory
    pub data_path: Option<PathBuf>,
    /// Base url of the property API; takes precedence over `data_path`
    pub api_url: Option<String>,
    pub prefs_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let page_size = parse_or(&lookup, "HOUSES_PAGE_SIZE", 20u32, "a positive integer")?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HOUSES_PAGE_SIZE",
                expected: "a positive integer",
                found: "0".to_string(),
            });
        }
        let debounce_ms = parse_or(&lookup, "HOUSES_DEBOUNCE_MS", 300u64, "milliseconds")?;
        let virtualize_threshold =
            parse_or(&lookup, "HOUSES_VIRTUALIZE_THRESHOLD", 100u64, "a row count")?;
        let stale_after_secs = parse_or(&lookup, "HOUSES_STALE_AFTER_SECS", 30u64, "seconds")?;

        let prefs_path = match non_empty(&lookup, "HOUSES_PREFS_PATH") {
            Some(path) => PathBuf::from(path),
            None => ProjectDirs::from("com", "houses", "houses-board")
                .ok_or(ConfigError::NoConfigDir)?
                .config_dir()
                .join(FILTER_PREFERENCES_FILE),
        };

        Ok(Self {
            page_size,
            search_debounce: Duration::from_millis(debounce_ms),
            virtualize_threshold,
            stale_after: Duration::from_secs(stale_after_secs),
            data_path: non_empty(&lookup, "HOUSES_DATA_PATH").map(PathBuf::from),
            api_url: non_empty(&lookup, "HOUSES_API_URL"),
            prefs_path,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match non_empty(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            expected,
            found: raw,
        }),
    }
}
