//! Error types for the user flows.

use thiserror::Error;

use crate::types::events::EventError;

/// Failures of a collaborator store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("record not found: {0}")]
    Missing(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the security, settings and profile flows.
///
/// Validation failures are not errors: the rejected form is returned to the
/// caller instead.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type AuthResult<T> = Result<T, AuthError>;
