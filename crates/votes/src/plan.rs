//! Vote transition planning.
//!
//! `plan` is pure: it reads the existing record and the command and produces
//! the next record state together with the deltas the change implies. The
//! caller owns persistence and event bookkeeping.

use crate::error::{VoteError, VoteResult};
use commio_credits::quadratic_cost;
use commio_types::{ContentId, ContentKind, ScoreDelta, Timestamp, UserId, VoteDirection, VoteRecord};
use serde::{Deserialize, Serialize};

/// Maximum accepted vote weight.
pub const MAX_VOTE_WEIGHT: u32 = 10;

/// A vote request from a voter against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCommand {
    /// The voting user.
    pub voter: UserId,
    /// Author of the target content (for self-vote rejection and
    /// author-side reputation effects).
    pub author: UserId,
    /// The content voted on.
    pub target: ContentId,
    /// Kind of the target content.
    pub kind: ContentKind,
    /// Requested direction (`None` clears an active vote).
    pub direction: VoteDirection,
    /// Requested weight; ignored when clearing.
    pub weight: u32,
}

/// What a vote command does to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteAction {
    /// A vote became active where none was.
    Cast,
    /// An active vote flipped direction.
    Toggled,
    /// An active vote kept its direction but changed weight.
    Reweighted,
    /// An active vote was removed.
    Cleared,
    /// Nothing changed (duplicate vote, or clearing an absent vote).
    Noop,
}

/// Planned transition for one vote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotePlan {
    /// What kind of change this is.
    pub action: VoteAction,
    /// The record state after the change. `None` only for a no-op with no
    /// prior record.
    pub record: Option<VoteRecord>,
    /// Whether the record is newly created (vs. updated in place).
    pub creates_record: bool,
    /// Direction before the change.
    pub old_direction: VoteDirection,
    /// Atomic change to the target's tally.
    pub score: ScoreDelta,
    /// Credits to debit from the voter (quadratic, newly spent weight only).
    pub credit_charge: u64,
    /// Credits to return to the voter.
    pub credit_refund: u64,
}

/// Plan the transition a command makes against the existing record.
///
/// Self-votes are rejected; active directions require a weight between 1
/// and [`MAX_VOTE_WEIGHT`]. Toggling at the same weight costs nothing: the
/// credits are already spent. Weight changes charge or refund only the
/// quadratic difference.
pub fn plan(
    existing: Option<&VoteRecord>,
    cmd: &VoteCommand,
    now: Timestamp,
) -> VoteResult<VotePlan> {
    if cmd.voter == cmd.author {
        return Err(VoteError::SelfVote {
            voter: cmd.voter,
            target: cmd.target,
        });
    }
    if cmd.direction.is_active() && (cmd.weight == 0 || cmd.weight > MAX_VOTE_WEIGHT) {
        return Err(VoteError::InvalidWeight {
            weight: cmd.weight,
            max: MAX_VOTE_WEIGHT,
        });
    }

    let old_direction = existing.map_or(VoteDirection::None, |r| r.direction);
    let old_weight = existing.map_or(0, |r| if r.is_active() { r.weight } else { 0 });
    let new_weight = if cmd.direction.is_active() {
        cmd.weight
    } else {
        0
    };

    let action = match (old_direction.is_active(), cmd.direction.is_active()) {
        (false, false) => VoteAction::Noop,
        (false, true) => VoteAction::Cast,
        (true, false) => VoteAction::Cleared,
        (true, true) if old_direction == cmd.direction && old_weight == new_weight => {
            VoteAction::Noop
        }
        (true, true) if old_direction == cmd.direction => VoteAction::Reweighted,
        (true, true) => VoteAction::Toggled,
    };

    if action == VoteAction::Noop {
        return Ok(VotePlan {
            action,
            record: existing.cloned(),
            creates_record: false,
            old_direction,
            score: ScoreDelta::default(),
            credit_charge: 0,
            credit_refund: 0,
        });
    }

    let old_contribution = old_direction.score_sign() * old_weight as i64;
    let new_contribution = cmd.direction.score_sign() * new_weight as i64;
    let score = ScoreDelta {
        score: new_contribution - old_contribution,
        upvotes: count_delta(old_direction, cmd.direction, VoteDirection::Up),
        downvotes: count_delta(old_direction, cmd.direction, VoteDirection::Down),
    };

    let old_cost = quadratic_cost(old_weight);
    let new_cost = quadratic_cost(new_weight);
    let credit_charge = new_cost.saturating_sub(old_cost);
    let credit_refund = old_cost.saturating_sub(new_cost);

    let record = match existing {
        Some(prior) => VoteRecord {
            direction: cmd.direction,
            weight: if cmd.direction.is_active() {
                cmd.weight
            } else {
                prior.weight
            },
            updated_at: now,
            ..prior.clone()
        },
        None => VoteRecord {
            voter: cmd.voter,
            target: cmd.target,
            kind: cmd.kind,
            direction: cmd.direction,
            weight: cmd.weight,
            author_event: None,
            voter_event: None,
            created_at: now,
            updated_at: now,
        },
    };

    Ok(VotePlan {
        action,
        creates_record: existing.is_none(),
        old_direction,
        score,
        credit_charge,
        credit_refund,
        record: Some(record),
    })
}

fn count_delta(old: VoteDirection, new: VoteDirection, which: VoteDirection) -> i32 {
    let was = (old == which) as i32;
    let is = (new == which) as i32;
    is - was
}
