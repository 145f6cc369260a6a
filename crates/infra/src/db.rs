//! Database adapters: connection pools and SQL error mapping.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Database` |
//! | PoolClosed | N/A | `Database` |
//! | ColumnDecode / Decode | N/A | `Decode` |
//! | Other | N/A | `Database` |

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{PgPool, SqlitePool};
use thiserror::Error;

use acctparty_core::DomainError;

use crate::config::{AppConfig, DatabaseBackend};

/// Storage-level failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database { operation: &'static str, message: String },

    #[error("conflict in {operation}: {message}")]
    Conflict { operation: &'static str, message: String },

    #[error("failed to decode row in {operation}: {message}")]
    Decode { operation: &'static str, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("lock poisoned")]
    Poisoned,
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict { operation, message },
                _ => StoreError::Database { operation, message },
            }
        }
        sqlx::Error::PoolClosed => StoreError::Database {
            operation,
            message: "connection pool closed".to_string(),
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::Decode {
            operation,
            message: err.to_string(),
        },
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

/// Connection pool for the configured backend.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Open a pool for `config`.
pub async fn connect(config: &AppConfig) -> Result<DbPool, StoreError> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await
                .map_err(|e| map_sqlx_error("connect", e))?;
            Ok(DbPool::Postgres(pool))
        }
        DatabaseBackend::Sqlite => {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await
                .map_err(|e| map_sqlx_error("connect", e))?;
            Ok(DbPool::Sqlite(pool))
        }
    }
}
