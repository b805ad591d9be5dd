//! Error taxonomy shared by repositories and services

use crate::infrastructure::entities::BookingStatus;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input. Never retried.
    #[error("{0}")]
    Validation(String),

    /// A booking invariant would be violated (duplicate active booking, slot taken).
    #[error("{0}")]
    Conflict(String),

    /// The actor is not a member of the room or may not perform the transition.
    #[error("{0}")]
    Forbidden(String),

    #[error("cannot change booking status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Backing store failure. Transient, safe to retry the whole operation.
    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Storage(_))
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Storage(_) => "storage",
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("record"),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ServiceError::Conflict(db_err.message().to_owned())
            }
            other => ServiceError::Storage(other),
        }
    }
}
