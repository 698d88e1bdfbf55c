//! Persistence interface for the Community.io reputation ledger
//!
//! Provides a pluggable store trait with an in-memory implementation. The
//! trait models what the ledger needs from any backing database:
//!
//! - typed reads keyed by identifier, returning versions for the records
//!   that are read-modify-written (credit accounts, vote records)
//! - additive bump operations for aggregates (target scores, user stats),
//!   so concurrent writers never lose updates to a cached value
//! - an all-or-nothing [`LedgerStore::commit`] applying a whole
//!   [`WriteBatch`]: every optimistic version check passes or nothing is
//!   applied, which is what lets the facade guarantee that a failed
//!   operation has no partial visible effect

mod memory;
mod metrics;

use async_trait::async_trait;
use commio_credits::CreditAccount;
use commio_types::{
    ContentId, ContentKind, EventId, Page, ReputationEvent, ScoreDelta, StatsDelta, TargetScore,
    Timestamp, UserBadge, UserId, UserStats, VoteRecord,
};
use thiserror::Error;

pub use memory::MemoryStore;
pub use metrics::{MetricsError, StoreMetrics};

/// Errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An optimistic version check failed; the caller should re-read and
    /// retry.
    #[error("version conflict on {record}")]
    VersionConflict {
        /// Description of the conflicting record.
        record: String,
    },

    /// A record the batch requires does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing record.
        what: String,
    },

    /// Backend failure (I/O, connection, corrupt state).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying after a re-read can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A record together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The record.
    pub value: T,
    /// Version at read time; pass back via [`VersionCheck::Is`] on write.
    pub version: u64,
}

/// Expected state of a record at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// The record must not exist yet.
    Absent,
    /// The record must still be at this version.
    Is(u64),
}

/// One write in a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Replace a credit account, guarded by a version check.
    PutCredit {
        /// Expected current state.
        check: VersionCheck,
        /// New account state.
        account: CreditAccount,
    },
    /// Replace a vote record, guarded by a version check.
    PutVote {
        /// Expected current state.
        check: VersionCheck,
        /// New record state.
        record: VoteRecord,
    },
    /// Atomically add a delta to a target's tally.
    BumpScore {
        /// The target content.
        target: ContentId,
        /// Kind of the content.
        kind: ContentKind,
        /// Signed change.
        delta: ScoreDelta,
    },
    /// Atomically add a delta to a user's stats.
    BumpStats {
        /// The user.
        user: UserId,
        /// Signed change.
        delta: StatsDelta,
    },
    /// Append an event to the log. The id must come from
    /// [`LedgerStore::allocate_event_ids`].
    AppendEvent {
        /// The complete event.
        event: ReputationEvent,
    },
    /// Stamp an existing event as reversed. Conflicts if it already is,
    /// so a racing double-reversal fails the whole batch.
    MarkReversed {
        /// The event being reversed.
        event: EventId,
        /// Reversal time.
        at: Timestamp,
    },
    /// Award a badge. A no-op if the user already holds it.
    AwardBadge {
        /// The grant.
        grant: UserBadge,
    },
}

/// An ordered set of writes applied atomically by [`LedgerStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch contains no writes.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The writes, in application order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Queue a credit account replacement.
    pub fn put_credit(&mut self, check: VersionCheck, account: CreditAccount) -> &mut Self {
        self.ops.push(WriteOp::PutCredit { check, account });
        self
    }

    /// Queue a vote record replacement.
    pub fn put_vote(&mut self, check: VersionCheck, record: VoteRecord) -> &mut Self {
        self.ops.push(WriteOp::PutVote { check, record });
        self
    }

    /// Queue an additive tally change.
    pub fn bump_score(&mut self, target: ContentId, kind: ContentKind, delta: ScoreDelta) -> &mut Self {
        self.ops.push(WriteOp::BumpScore {
            target,
            kind,
            delta,
        });
        self
    }

    /// Queue an additive stats change.
    pub fn bump_stats(&mut self, user: UserId, delta: StatsDelta) -> &mut Self {
        self.ops.push(WriteOp::BumpStats { user, delta });
        self
    }

    /// Queue an event append.
    pub fn append_event(&mut self, event: ReputationEvent) -> &mut Self {
        self.ops.push(WriteOp::AppendEvent { event });
        self
    }

    /// Queue a reversal stamp.
    pub fn mark_reversed(&mut self, event: EventId, at: Timestamp) -> &mut Self {
        self.ops.push(WriteOp::MarkReversed { event, at });
        self
    }

    /// Queue a badge award.
    pub fn award_badge(&mut self, grant: UserBadge) -> &mut Self {
        self.ops.push(WriteOp::AwardBadge { grant });
        self
    }
}

/// Transactional read/write interface over ledger records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read a credit account with its version.
    async fn credit_account(&self, user: UserId) -> StoreResult<Option<Versioned<CreditAccount>>>;

    /// Read a vote record with its version.
    async fn vote(
        &self,
        voter: UserId,
        target: ContentId,
        kind: ContentKind,
    ) -> StoreResult<Option<Versioned<VoteRecord>>>;

    /// Read a user's stats snapshot; zeroed for unknown users.
    async fn stats(&self, user: UserId) -> StoreResult<UserStats>;

    /// Read a target's tally; zeroed for targets never voted on.
    async fn target_score(&self, target: ContentId, kind: ContentKind) -> StoreResult<TargetScore>;

    /// Read one event by id.
    async fn event(&self, id: EventId) -> StoreResult<Option<ReputationEvent>>;

    /// Read a user's full event log, oldest-first.
    async fn events(&self, user: UserId) -> StoreResult<Vec<ReputationEvent>>;

    /// Read one page of a user's event log, newest-first.
    async fn events_page(
        &self,
        user: UserId,
        page: u32,
        limit: u32,
    ) -> StoreResult<Page<ReputationEvent>>;

    /// Read a user's badges, oldest grant first.
    async fn badges(&self, user: UserId) -> StoreResult<Vec<UserBadge>>;

    /// Reserve `count` event ids. Ids are never reused; ids reserved for a
    /// batch that fails to commit simply leave gaps, like a database
    /// sequence.
    async fn allocate_event_ids(&self, count: u32) -> StoreResult<Vec<EventId>>;

    /// Apply a batch atomically: all version checks pass and every write
    /// lands, or nothing is applied.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
