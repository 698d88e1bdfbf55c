//! Commands accepted by the facade and the receipts it returns.
//!
//! Receipts carry the ledger-owned values callers render; clients never
//! derive scores or balances locally.

use commio_types::{ContentAction, ContentId, EventId, TargetScore, UserBadge, UserId, VoteRecord};
use commio_votes::VoteAction;
use serde::{Deserialize, Serialize};

/// A non-vote scored action (posting, accepting an answer, a bounty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCommand {
    /// User receiving the points.
    pub user: UserId,
    /// Content the action concerns.
    pub source: ContentId,
    /// What happened.
    pub action: ContentAction,
}

/// Result of a vote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// What the command did.
    pub action: VoteAction,
    /// The vote record after the change; `None` when clearing a vote that
    /// never existed.
    pub vote: Option<VoteRecord>,
    /// The target's tally after the change.
    pub target: TargetScore,
    /// The voter's credit balance after the change.
    pub voter_balance: u64,
    /// Badges newly earned by the affected users.
    pub newly_awarded: Vec<UserBadge>,
}

/// Result of a content event or a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReceipt {
    /// The event appended to the log.
    pub event: EventId,
    /// The user's reputation total after the change.
    pub reputation: i64,
    /// Badges newly earned.
    pub newly_awarded: Vec<UserBadge>,
}

/// Read-only composite view of one user's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Cached reputation total.
    pub reputation: i64,
    /// Badges held.
    pub badges: Vec<UserBadge>,
    /// Vote-credit balance.
    pub credit_balance: u64,
}
