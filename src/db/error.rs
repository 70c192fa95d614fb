//! Database error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the connectivity layer and the Postgres adapters.
#[derive(Debug, Error)]
pub enum DbError {
    /// The last probe found the database unreachable. Raised without
    /// touching the pool.
    #[error("database is unavailable")]
    Unavailable,

    #[error("database did not respond within {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("schema statement #{index} failed: {source}")]
    Script {
        index: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("unexpected column value: {0}")]
    Decode(String),
}

impl DbError {
    /// Whether this error means the database could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        match self {
            DbError::Unavailable | DbError::Timeout(_) => true,
            DbError::Sqlx(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }

    /// SQLSTATE 23505, raised by unique indexes.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(e)) => e.code().as_deref() == Some("23505"),
            _ => false,
        }
    }
}
