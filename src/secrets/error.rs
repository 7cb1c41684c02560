use crate::cryptor::CryptorError;
use crate::db::RepositoryError;
use thiserror::Error;
use tracing::debug;

/// Outcome of a create/retrieve call as seen by the transport layer.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Secret not found")]
    NotFound,

    #[error("Stored secret failed integrity check: {0}")]
    Integrity(#[source] CryptorError),

    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("Secret decrypted but could not be consumed: {0}")]
    ConsumeFailed(#[source] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SecretError {
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using SecretError
pub type SecretResult<T> = Result<T, SecretError>;

/// Why a retrieval was refused. Never leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NotFoundCause {
    Absent,
    Expired,
    Consumed,
    PassphraseMissing,
    WrongPassphrase,
}

/// Collapse every refusal cause into the single external not-found outcome.
pub(crate) fn conceal(cause: NotFoundCause, lookup_prefix: &str) -> SecretError {
    debug!(lookup = lookup_prefix, ?cause, "Secret retrieval refused");
    SecretError::NotFound
}
