//! Error types for the `PostgreSQL` provider.
//!
//! [`PostgresError`] covers pool setup. Once a provider hands out
//! connections, failures are reported through the mapping core's own
//! [`DbError`] and [`ProviderError`].

use entwine_core::{DbError, ProviderError};

/// Errors raised while setting up the pool.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A failed statement, tagged with its SQL text.
pub(crate) fn statement_error(sql: &str, error: &sqlx::Error) -> DbError {
    DbError::Statement {
        sql: sql.to_owned(),
        message: error.to_string(),
    }
}

/// A failed pool checkout.
pub(crate) fn acquire_error(error: &sqlx::Error) -> ProviderError {
    ProviderError::NoConnection {
        reason: error.to_string(),
    }
}
