pub mod memory;
pub mod models;
pub mod queries;

pub use memory::MemorySecretRepository;
pub use models::{NewSecret, SecretRecord};
pub use queries::{init_db, DbPool, SecretRepository, SqliteSecretRepository};

use thiserror::Error;

/// Storage-level failures surfaced by a [`SecretRepository`].
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Lookup key already exists")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err.to_string())
            }
            other => Self::Storage(other),
        }
    }
}

/// Result type alias using RepositoryError
pub type RepositoryResult<T> = Result<T, RepositoryError>;
