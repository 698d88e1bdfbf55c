//! Error types for the credit ledger.

use commio_types::UserId;
use thiserror::Error;

/// Errors from credit ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreditError {
    /// Balance cannot cover the requested spend.
    #[error("insufficient credits for {user}: need {needed}, have {available}")]
    InsufficientCredits {
        /// Account owner.
        user: UserId,
        /// Credits the operation requires.
        needed: u64,
        /// Credits currently available.
        available: u64,
    },
}

/// A refund exceeded the amount previously spent.
///
/// This indicates a caller bug. The ledger clamps the refund to the spend
/// ceiling and keeps going; the report is returned as data so the caller can
/// log it, never raised as a hard failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("refund of {requested} exceeds outstanding spend of {refundable} for {user}")]
pub struct LedgerInconsistency {
    /// Account owner.
    pub user: UserId,
    /// Refund amount that was requested.
    pub requested: u64,
    /// Amount that was actually refundable.
    pub refundable: u64,
}

/// Result type alias for credit operations.
pub type CreditResult<T> = Result<T, CreditError>;
