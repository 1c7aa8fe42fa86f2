use std::time::Duration;

/// Error kinds surfaced by the domain services.
///
/// `Validation` and `InvalidTransition` are never retried automatically;
/// `Conflict` and `Timeout` are safe to retry after re-reading current state.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition from {from} to {requested}")]
    InvalidTransition { from: String, requested: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage did not respond within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn invalid_transition(from: impl ToString, requested: impl ToString) -> Self {
        DomainError::InvalidTransition {
            from: from.to_string(),
            requested: requested.to_string(),
        }
    }
}
