//! Error types for the entitlement engine

use thiserror::Error;

/// Domain errors surfaced to the API boundary
///
/// Storage failures map onto `Database` and are reported as generic
/// infrastructure errors; everything else is part of the user-facing
/// taxonomy the UI branches on.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("listing is not owned by the caller")]
    Forbidden,

    #[error("no premium credits remaining")]
    InsufficientCredits,

    #[error("listing is already featured")]
    AlreadyFeatured,

    #[error("listing is already marked sold")]
    AlreadySold,

    #[error("already on the {0} plan")]
    AlreadyOnPlan(String),

    #[error("invalid downgrade target: {0}")]
    InvalidPlan(String),

    #[error("payment amount {0} is below the lowest plan threshold")]
    InvalidPaymentAmount(i64),

    #[error("entitlement was modified by another request, retry: {0}")]
    ConcurrentModification(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for EntitlementError {
    fn from(err: sqlx::Error) -> Self {
        EntitlementError::Database(err.to_string())
    }
}

pub type EntitlementResult<T> = Result<T, EntitlementError>;
