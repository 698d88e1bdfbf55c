//! Deterministic badge evaluation.

use crate::catalog::BadgeCatalog;
use commio_types::{BadgeId, UserStats};
use std::collections::HashSet;

/// Evaluate the catalog against a stats snapshot.
///
/// Returns badges newly earned, in ascending (tier, id) order. Badges in
/// `held` are skipped, so re-running with no new activity returns an empty
/// list. Pure: awarding is the caller's job.
pub fn evaluate(catalog: &BadgeCatalog, stats: &UserStats, held: &HashSet<BadgeId>) -> Vec<BadgeId> {
    let mut earned: Vec<_> = catalog
        .badges
        .iter()
        .filter(|badge| !held.contains(&badge.id) && badge.rule.satisfied(stats))
        .map(|badge| (badge.tier, badge.id))
        .collect();
    earned.sort();
    earned.into_iter().map(|(_, id)| id).collect()
}
