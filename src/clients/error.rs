//! Client domain errors.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    /// Optimistic lock lost: the row changed since it was read.
    #[error("{0}")]
    Conflict(String),

    #[error("validation failed for {} field(s)", .0.len())]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl ClientError {
    /// Classify a storage error, turning unique violations into
    /// [`ClientError::AlreadyExists`].
    pub fn from_db(err: DbError, what: &str) -> Self {
        if err.is_unique_violation() {
            ClientError::AlreadyExists(format!("{what} already exists"))
        } else {
            ClientError::Database(err)
        }
    }

    pub fn not_found_id(id: i64) -> Self {
        ClientError::NotFound(format!("Client with id {id} not found"))
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        ClientError::Database(DbError::Sqlx(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_unique_db_errors_stay_database_errors() {
        let err = ClientError::from_db(DbError::Unavailable, "client");
        assert!(matches!(err, ClientError::Database(DbError::Unavailable)));
    }

    #[test]
    fn validation_message_counts_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("lastName".to_string(), "is required".to_string());
        assert_eq!(
            ClientError::Validation(fields).to_string(),
            "validation failed for 1 field(s)"
        );
    }
}
