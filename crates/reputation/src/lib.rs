//! Reputation accumulator for the Community.io ledger
//!
//! Reputation is derived from an append-only log of scored events. The
//! cached per-user total is an optimization: `recompute` folds the full log
//! and must always equal the cache. Reversal never deletes history; it
//! appends a compensating event with negated points and stamps the original
//! as reversed.
//!
//! Point values per action live in [`PointsConfig`], not in inline logic.

mod config;
mod error;
mod events;

pub use config::PointsConfig;
pub use error::{ReputationError, ReputationResult};
pub use events::{compensating_event, recompute, scored_event};
