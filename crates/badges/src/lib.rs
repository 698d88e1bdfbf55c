//! Badge catalog and threshold evaluation for the Community.io ledger
//!
//! Badges are static reference data: a rule is a pure predicate over a
//! snapshot of user stats. Evaluation is deterministic (bronze, then
//! silver, then gold, then id order within a tier), never awards a badge
//! the user already holds, and has no side effects — running it twice with
//! no new activity awards nothing the second time.

mod catalog;
mod evaluate;

pub use catalog::{Badge, BadgeCatalog, BadgeRule, BadgeTier};
pub use evaluate::evaluate;
