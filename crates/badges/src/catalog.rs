//! Badge reference data.

use commio_types::{BadgeId, UserStats};
use serde::{Deserialize, Serialize};

/// Badge tier, in ascending evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BadgeTier {
    /// Entry-level achievements.
    Bronze,
    /// Sustained participation.
    Silver,
    /// Exceptional standing.
    Gold,
}

/// Threshold rule a badge is awarded for.
///
/// Rules are pure predicates over a [`UserStats`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeRule {
    /// Reputation total at or above the threshold.
    ReputationAtLeast(i64),
    /// Questions posted at or above the threshold.
    QuestionsAtLeast(u32),
    /// Answers posted at or above the threshold.
    AnswersAtLeast(u32),
    /// Accepted answers at or above the threshold.
    AcceptedAnswersAtLeast(u32),
    /// Votes cast at or above the threshold.
    VotesCastAtLeast(u32),
}

impl BadgeRule {
    /// Whether the snapshot satisfies this rule.
    pub fn satisfied(&self, stats: &UserStats) -> bool {
        match *self {
            BadgeRule::ReputationAtLeast(n) => stats.reputation >= n,
            BadgeRule::QuestionsAtLeast(n) => stats.questions >= n,
            BadgeRule::AnswersAtLeast(n) => stats.answers >= n,
            BadgeRule::AcceptedAnswersAtLeast(n) => stats.accepted_answers >= n,
            BadgeRule::VotesCastAtLeast(n) => stats.votes_cast >= n,
        }
    }
}

/// One badge definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Stable identifier.
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// Tier, which also fixes evaluation order.
    pub tier: BadgeTier,
    /// Awarding rule.
    pub rule: BadgeRule,
}

/// The set of badges the evaluator checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCatalog {
    /// All badge definitions.
    pub badges: Vec<Badge>,
}

impl BadgeCatalog {
    /// Look up a badge definition.
    pub fn get(&self, id: BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == id)
    }
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        let badge = |id: u32, name: &str, tier: BadgeTier, rule: BadgeRule| Badge {
            id: BadgeId(id),
            name: name.to_string(),
            tier,
            rule,
        };

        Self {
            badges: vec![
                badge(
                    1,
                    "Student",
                    BadgeTier::Bronze,
                    BadgeRule::ReputationAtLeast(15),
                ),
                badge(
                    2,
                    "Curious",
                    BadgeTier::Bronze,
                    BadgeRule::QuestionsAtLeast(1),
                ),
                badge(3, "Teacher", BadgeTier::Bronze, BadgeRule::AnswersAtLeast(1)),
                badge(
                    4,
                    "Supporter",
                    BadgeTier::Bronze,
                    BadgeRule::VotesCastAtLeast(1),
                ),
                badge(
                    5,
                    "Established",
                    BadgeTier::Silver,
                    BadgeRule::ReputationAtLeast(500),
                ),
                badge(
                    6,
                    "Enlightened",
                    BadgeTier::Silver,
                    BadgeRule::AcceptedAnswersAtLeast(10),
                ),
                badge(
                    7,
                    "Trusted",
                    BadgeTier::Gold,
                    BadgeRule::ReputationAtLeast(2000),
                ),
                badge(
                    8,
                    "Guru",
                    BadgeTier::Gold,
                    BadgeRule::AcceptedAnswersAtLeast(50),
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_ids_unique() {
        let catalog = BadgeCatalog::default();
        let mut ids: Vec<u32> = catalog.badges.iter().map(|b| b.id.0).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.badges.len());
    }

    #[test]
    fn test_rule_predicates() {
        let stats = UserStats {
            reputation: 20,
            accepted_answers: 1,
            ..UserStats::default()
        };

        assert!(BadgeRule::ReputationAtLeast(15).satisfied(&stats));
        assert!(!BadgeRule::ReputationAtLeast(21).satisfied(&stats));
        assert!(BadgeRule::AcceptedAnswersAtLeast(1).satisfied(&stats));
        assert!(!BadgeRule::VotesCastAtLeast(1).satisfied(&stats));
    }

    #[test]
    fn test_catalog_serialization() {
        let catalog = BadgeCatalog::default();
        let json = serde_json::to_string(&catalog).expect("serialize");
        let back: BadgeCatalog = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, catalog);
    }
}
