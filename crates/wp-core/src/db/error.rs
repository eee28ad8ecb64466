//! Repository error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The database could not be reached or the pool timed out.
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    /// `entity` is the display name used in API messages ("Incident", "Alert", ...).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A unique key (such as a user email) already exists.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record",
                id: String::new(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) => DbError::Query(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Unavailable(err.to_string())
            }
            sqlx::Error::Io(e) => DbError::Unavailable(e.to_string()),
            sqlx::Error::Configuration(msg) => DbError::Configuration(msg.to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}
