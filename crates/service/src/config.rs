//! Service configuration.
//!
//! Aggregates the point values, credit policy, retry budget, privilege
//! thresholds, and badge catalog. Everything has working defaults so a
//! service can be constructed with `ServiceConfig::default()`.

use commio_badges::BadgeCatalog;
use commio_reputation::PointsConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vote-credit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditConfig {
    /// Balance a user starts with before any refill.
    pub initial_balance: u64,

    /// Credits granted per refill period.
    pub refill_amount: u64,

    /// Length of one refill period. Grants are idempotent per period.
    #[serde(with = "humantime_serde")]
    pub refill_period: Duration,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            initial_balance: 20,
            refill_amount: 20,
            refill_period: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Bounded retry budget for optimistic-concurrency conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per operation before surfacing the conflict.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// One reputation-gated privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    /// What the privilege allows.
    pub name: String,
    /// Minimum reputation required.
    pub min_reputation: i64,
}

/// Static table of reputation-gated privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeTable {
    /// Privileges in ascending threshold order.
    pub privileges: Vec<Privilege>,
}

impl PrivilegeTable {
    /// Privileges available at a reputation total.
    pub fn available_at(&self, reputation: i64) -> impl Iterator<Item = &Privilege> {
        self.privileges
            .iter()
            .filter(move |p| reputation >= p.min_reputation)
    }
}

impl Default for PrivilegeTable {
    fn default() -> Self {
        let privilege = |name: &str, min_reputation: i64| Privilege {
            name: name.to_string(),
            min_reputation,
        };

        Self {
            privileges: vec![
                privilege("post content", 1),
                privilege("accept answers", 15),
                privilege("cast weighted votes", 50),
                privilege("downvote", 125),
                privilege("review edits", 500),
                privilege("moderate", 2000),
            ],
        }
    }
}

/// Complete facade configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// Point values per scored action.
    pub points: PointsConfig,
    /// Vote-credit policy.
    pub credits: CreditConfig,
    /// Conflict retry budget.
    pub retry: RetryConfig,
    /// Reputation-gated privileges.
    pub privileges: PrivilegeTable,
    /// Badge reference data.
    pub catalog: BadgeCatalog,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServiceConfig::default();

        assert_eq!(config.credits.initial_balance, 20);
        assert_eq!(config.credits.refill_period, Duration::from_secs(604_800));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.points.accepted_answer, 15);
        assert!(!config.catalog.badges.is_empty());
    }

    #[test]
    fn test_privileges_available_at() {
        let table = PrivilegeTable::default();

        let at_zero: Vec<_> = table.available_at(0).collect();
        assert!(at_zero.is_empty());

        let at_fifteen: Vec<_> = table.available_at(15).map(|p| p.name.as_str()).collect();
        assert_eq!(at_fifteen, vec!["post content", "accept answers"]);
    }

    #[test]
    fn test_config_serialization() {
        let config = ServiceConfig {
            retry: RetryConfig { max_attempts: 5 },
            ..ServiceConfig::default()
        };

        // Durations serialize humantime-style ("7d"), not as raw structs
        let json = serde_json::to_string(&config).expect("serialize");
        let back: ServiceConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
        assert_eq!(back.retry.max_attempts, 5);
    }
}
