use std::path::PathBuf;
use std::sync::Arc;

/// Failures of a preference store backend
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Failed to access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Preference store unavailable: {0}")]
    Unavailable(String),
}

/// Failures surfaced by the query executor.
///
/// Cloneable so that every caller waiting on a de-duplicated request receives
/// the same error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("Failed to load properties: {0}")]
    Fetch(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for QueryError {
    fn from(error: anyhow::Error) -> Self {
        QueryError::Fetch(Arc::new(error))
    }
}

/// Invalid configuration values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, found `{found}`")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("No configuration directory available; set HOUSES_PREFS_PATH")]
    NoConfigDir,
}
