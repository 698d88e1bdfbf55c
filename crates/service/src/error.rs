//! Error types for the reputation service facade.
//!
//! Every component error converts into [`ServiceError`]; the facade
//! guarantees that any error leaves no partial visible effect.

use commio_credits::CreditError;
use commio_reputation::ReputationError;
use commio_store::StoreError;
use commio_votes::VoteError;
use thiserror::Error;

/// Top-level error type for reputation service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Vote validation errors (self-vote, bad weight).
    #[error("vote rejected: {0}")]
    Vote(#[from] VoteError),

    /// Credit ledger errors (insufficient balance).
    #[error("credit ledger: {0}")]
    Credits(#[from] CreditError),

    /// Reputation log errors (already reversed, unknown event).
    #[error("reputation log: {0}")]
    Reputation(#[from] ReputationError),

    /// Store errors that are not retryable version conflicts.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Version conflicts persisted through the bounded retry budget.
    /// Transient: the caller may retry the whole operation.
    #[error("operation abandoned after {attempts} conflicting attempts")]
    ConcurrencyConflict {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use commio_types::{ContentId, UserId};

    #[test]
    fn test_error_display() {
        let err = ServiceError::ConcurrencyConflict { attempts: 3 };
        assert!(err.to_string().contains('3'));

        let err: ServiceError = VoteError::SelfVote {
            voter: UserId(1),
            target: ContentId(2),
        }
        .into();
        assert!(err.to_string().contains("own content"));
    }

    #[test]
    fn test_error_conversion() {
        let credit_err = CreditError::InsufficientCredits {
            user: UserId(1),
            needed: 4,
            available: 1,
        };
        let err: ServiceError = credit_err.into();
        assert!(matches!(err, ServiceError::Credits(_)));
    }
}
