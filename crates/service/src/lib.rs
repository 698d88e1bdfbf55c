//! Reputation service facade for Community.io
//!
//! Composes the vote record store, the credit ledger, the reputation
//! accumulator, and the badge evaluator into the single entry point API
//! routes call:
//!
//! 1. A vote or content event arrives at [`ReputationService`]
//! 2. The vote transition is planned and validated
//! 3. Credits are spent or refunded on the voter's account
//! 4. Reputation events are appended (with compensations for reversals)
//! 5. Badge thresholds are re-checked against the post-update stats
//! 6. Every effect is committed in one atomic store batch
//!
//! Either all effects of an operation become visible or none do. Optimistic
//! version conflicts are retried a bounded number of times before being
//! surfaced as [`ServiceError::ConcurrencyConflict`]. Operations by the same
//! voter on the same target serialize on a keyed lock; distinct users
//! proceed in parallel.

mod api;
mod config;
mod error;
mod locks;
mod metrics;
mod service;

pub use api::{ContentCommand, ContentReceipt, Standing, VoteReceipt};
pub use config::{CreditConfig, Privilege, PrivilegeTable, RetryConfig, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use metrics::{MetricsError, ServiceMetrics};
pub use service::{ReputationService, MAX_PAGE_LIMIT};

// Re-export the command and config types callers compose with.
pub use commio_badges::{Badge, BadgeCatalog, BadgeRule, BadgeTier};
pub use commio_reputation::PointsConfig;
pub use commio_votes::{VoteAction, VoteCommand, MAX_VOTE_WEIGHT};
