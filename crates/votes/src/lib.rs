//! Vote record store logic for the Community.io reputation ledger
//!
//! A voter holds at most one active vote per (target, kind). This crate
//! plans the transition a vote command makes against the existing record:
//! first cast, direction toggle, weight change, clear, or idempotent no-op.
//! The plan carries one atomic score delta plus the quadratic credit charge
//! or refund, so the caller can commit every effect of the change in a
//! single transaction.
//!
//! Casting the same direction twice is not an error: it returns a
//! [`VoteAction::Noop`] plan and the stored state is unchanged.

mod error;
mod plan;

pub use error::{VoteError, VoteResult};
pub use plan::{plan, VoteAction, VoteCommand, VotePlan, MAX_VOTE_WEIGHT};
