//! Error types for vote validation.

use commio_types::{ContentId, UserId};
use thiserror::Error;

/// Errors from vote command validation.
///
/// A repeated identical vote is deliberately absent here: duplicates are
/// idempotent no-ops, not failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    /// Voting on one's own content.
    #[error("invalid vote: {voter} cannot vote on own content {target}")]
    SelfVote {
        /// The voter.
        voter: UserId,
        /// The voter's own content.
        target: ContentId,
    },

    /// Weight outside the accepted range.
    #[error("invalid vote weight {weight}: must be between 1 and {max}")]
    InvalidWeight {
        /// Requested weight.
        weight: u32,
        /// Maximum accepted weight.
        max: u32,
    },
}

/// Result type alias for vote operations.
pub type VoteResult<T> = Result<T, VoteError>;
