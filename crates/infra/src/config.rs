//! Configuration loading from the environment.
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `DATABASE_URL` | `postgres://...` or `sqlite:...` | required |
//! | `ACCTPARTY_IN_MAX` | parties per aggregation query | `1000` |
//! | `ACCTPARTY_MAX_CONNECTIONS` | pool size | `5` |

use thiserror::Error;

/// Parties per `IN (...)` list; keeps queries under backend parameter limits.
pub const DEFAULT_IN_MAX: usize = 1000;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Pick the backend from the URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(DatabaseBackend::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(DatabaseBackend::Sqlite)
        } else {
            None
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("unsupported database url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub backend: DatabaseBackend,
    pub in_max: usize,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let backend = DatabaseBackend::from_url(&database_url)
            .ok_or_else(|| ConfigError::UnsupportedScheme(scheme(&database_url).to_string()))?;

        let in_max = match lookup("ACCTPARTY_IN_MAX") {
            Some(value) => parse_positive("ACCTPARTY_IN_MAX", &value)?,
            None => DEFAULT_IN_MAX,
        };
        let max_connections = match lookup("ACCTPARTY_MAX_CONNECTIONS") {
            Some(value) => parse_positive("ACCTPARTY_MAX_CONNECTIONS", &value)? as u32,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            backend,
            in_max,
            max_connections,
        })
    }
}

fn scheme(url: &str) -> &str {
    url.split_once(':').map(|(s, _)| s).unwrap_or(url)
}

fn parse_positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 && n <= u32::MAX as usize => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}
