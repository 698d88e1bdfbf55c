//! In-memory store backend.
//!
//! Tables live behind one `tokio::sync::RwLock`; a commit takes the write
//! lock, validates every version check against current state, and only then
//! applies the writes. Readers see either none or all of a batch.

use crate::metrics::{MetricsError, StoreMetrics};
use crate::{
    LedgerStore, StoreError, StoreResult, VersionCheck, Versioned, WriteBatch, WriteOp,
};
use async_trait::async_trait;
use commio_credits::CreditAccount;
use commio_types::{
    ContentId, ContentKind, EventId, Page, ReputationEvent, TargetScore, UserBadge, UserId,
    UserStats, VoteRecord,
};
use prometheus::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

type VoteKey = (UserId, ContentId, ContentKind);
type ScoreKey = (ContentId, ContentKind);

#[derive(Default)]
struct Tables {
    credits: HashMap<UserId, Versioned<CreditAccount>>,
    votes: HashMap<VoteKey, Versioned<VoteRecord>>,
    stats: HashMap<UserId, UserStats>,
    scores: HashMap<ScoreKey, TargetScore>,
    events: HashMap<EventId, ReputationEvent>,
    event_log: HashMap<UserId, Vec<EventId>>,
    badges: HashMap<UserId, Vec<UserBadge>>,
    next_event_id: u64,
}

/// In-memory [`LedgerStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    metrics: Option<Arc<StoreMetrics>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach Prometheus metrics.
    pub fn with_metrics(mut self, registry: &Registry) -> Result<Self, MetricsError> {
        self.metrics = Some(Arc::new(StoreMetrics::new(registry)?));
        Ok(self)
    }

    fn observe(&self, operation: &str, failed: bool) {
        if let Some(metrics) = &self.metrics {
            metrics
                .operations_total
                .with_label_values(&[operation])
                .inc();
            if failed {
                metrics
                    .operations_failed_total
                    .with_label_values(&[operation])
                    .inc();
            }
        }
    }
}

fn check_version(
    current: Option<u64>,
    check: VersionCheck,
    record: impl Fn() -> String,
) -> StoreResult<()> {
    let ok = match (check, current) {
        (VersionCheck::Absent, None) => true,
        (VersionCheck::Is(expected), Some(actual)) => expected == actual,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(StoreError::VersionConflict { record: record() })
    }
}

fn validate(tables: &Tables, batch: &WriteBatch) -> StoreResult<()> {
    for op in batch.ops() {
        match op {
            WriteOp::PutCredit { check, account } => {
                let user = account.user();
                check_version(
                    tables.credits.get(&user).map(|v| v.version),
                    *check,
                    || format!("credit account {user}"),
                )?;
            }
            WriteOp::PutVote { check, record } => {
                let key = (record.voter, record.target, record.kind);
                check_version(tables.votes.get(&key).map(|v| v.version), *check, || {
                    format!("vote {}/{}", record.voter, record.target)
                })?;
            }
            WriteOp::MarkReversed { event, .. } => {
                let stored = tables.events.get(event).ok_or_else(|| StoreError::NotFound {
                    what: format!("event {event}"),
                })?;
                if stored.is_reversed() {
                    // A racing reversal won; the caller re-reads and reports
                    // the domain error.
                    return Err(StoreError::VersionConflict {
                        record: format!("event {event}"),
                    });
                }
            }
            WriteOp::AppendEvent { event } => {
                if tables.events.contains_key(&event.id) {
                    return Err(StoreError::Backend(format!(
                        "duplicate event id {}",
                        event.id
                    )));
                }
            }
            WriteOp::BumpScore { .. } | WriteOp::BumpStats { .. } | WriteOp::AwardBadge { .. } => {}
        }
    }
    Ok(())
}

fn apply(tables: &mut Tables, batch: WriteBatch) {
    for op in batch.ops().iter().cloned() {
        match op {
            WriteOp::PutCredit { account, .. } => {
                let user = account.user();
                let version = tables.credits.get(&user).map_or(1, |v| v.version + 1);
                tables.credits.insert(
                    user,
                    Versioned {
                        value: account,
                        version,
                    },
                );
            }
            WriteOp::PutVote { record, .. } => {
                let key = (record.voter, record.target, record.kind);
                let version = tables.votes.get(&key).map_or(1, |v| v.version + 1);
                tables.votes.insert(
                    key,
                    Versioned {
                        value: record,
                        version,
                    },
                );
            }
            WriteOp::BumpScore {
                target,
                kind,
                delta,
            } => {
                tables
                    .scores
                    .entry((target, kind))
                    .or_insert_with(|| TargetScore::new(target, kind))
                    .apply(&delta);
            }
            WriteOp::BumpStats { user, delta } => {
                tables.stats.entry(user).or_default().apply(&delta);
            }
            WriteOp::AppendEvent { event } => {
                tables
                    .event_log
                    .entry(event.user)
                    .or_default()
                    .push(event.id);
                tables.events.insert(event.id, event);
            }
            WriteOp::MarkReversed { event, at } => {
                if let Some(stored) = tables.events.get_mut(&event) {
                    stored.reversed_at = Some(at);
                }
            }
            WriteOp::AwardBadge { grant } => {
                let held = tables.badges.entry(grant.user).or_default();
                if !held.iter().any(|b| b.badge == grant.badge) {
                    held.push(grant);
                }
            }
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn credit_account(&self, user: UserId) -> StoreResult<Option<Versioned<CreditAccount>>> {
        Ok(self.tables.read().await.credits.get(&user).cloned())
    }

    async fn vote(
        &self,
        voter: UserId,
        target: ContentId,
        kind: ContentKind,
    ) -> StoreResult<Option<Versioned<VoteRecord>>> {
        Ok(self
            .tables
            .read()
            .await
            .votes
            .get(&(voter, target, kind))
            .cloned())
    }

    async fn stats(&self, user: UserId) -> StoreResult<UserStats> {
        Ok(self
            .tables
            .read()
            .await
            .stats
            .get(&user)
            .copied()
            .unwrap_or_default())
    }

    async fn target_score(&self, target: ContentId, kind: ContentKind) -> StoreResult<TargetScore> {
        Ok(self
            .tables
            .read()
            .await
            .scores
            .get(&(target, kind))
            .copied()
            .unwrap_or_else(|| TargetScore::new(target, kind)))
    }

    async fn event(&self, id: EventId) -> StoreResult<Option<ReputationEvent>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn events(&self, user: UserId) -> StoreResult<Vec<ReputationEvent>> {
        let tables = self.tables.read().await;
        let ids = tables.event_log.get(&user);
        Ok(ids
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.events.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn events_page(
        &self,
        user: UserId,
        page: u32,
        limit: u32,
    ) -> StoreResult<Page<ReputationEvent>> {
        let tables = self.tables.read().await;
        let ids: &[EventId] = tables.event_log.get(&user).map_or(&[], |v| v.as_slice());
        let items = ids
            .iter()
            .rev()
            .skip(page as usize * limit as usize)
            .take(limit as usize)
            .filter_map(|id| tables.events.get(id).cloned())
            .collect();

        Ok(Page {
            items,
            page,
            limit,
            total: ids.len() as u64,
        })
    }

    async fn badges(&self, user: UserId) -> StoreResult<Vec<UserBadge>> {
        Ok(self
            .tables
            .read()
            .await
            .badges
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn allocate_event_ids(&self, count: u32) -> StoreResult<Vec<EventId>> {
        let mut tables = self.tables.write().await;
        let start = tables.next_event_id + 1;
        tables.next_event_id += count as u64;
        Ok((start..start + count as u64).map(EventId).collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let started = Instant::now();
        let result = {
            let mut tables = self.tables.write().await;
            match validate(&tables, &batch) {
                Ok(()) => {
                    apply(&mut tables, batch);
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };

        self.observe("commit", result.is_err());
        if let Some(metrics) = &self.metrics {
            metrics
                .commit_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }
        if let Err(err) = &result {
            debug!("commit rejected: {err}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commio_types::{ReputationAction, ScoreDelta, StatsDelta, Timestamp, VoteDirection};

    fn make_vote(voter: u64, target: u64) -> VoteRecord {
        VoteRecord {
            voter: UserId(voter),
            target: ContentId(target),
            kind: ContentKind::Answer,
            direction: VoteDirection::Up,
            weight: 1,
            author_event: None,
            voter_event: None,
            created_at: Timestamp(0),
            updated_at: Timestamp(0),
        }
    }

    fn make_event(id: EventId, user: u64, points: i64) -> ReputationEvent {
        ReputationEvent {
            id,
            user: UserId(user),
            action: ReputationAction::Answer,
            points,
            source: None,
            created_at: Timestamp(id.0 as i64),
            reversed_at: None,
            reverses: None,
        }
    }

    #[tokio::test]
    async fn test_put_and_read_back() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_vote(VersionCheck::Absent, make_vote(1, 2));
        store.commit(batch).await.expect("commit");

        let read = store
            .vote(UserId(1), ContentId(2), ContentKind::Answer)
            .await
            .expect("read")
            .expect("record");
        assert_eq!(read.version, 1);
        assert_eq!(read.value.direction, VoteDirection::Up);
    }

    #[tokio::test]
    async fn test_version_conflict_rejected() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put_vote(VersionCheck::Absent, make_vote(1, 2));
        store.commit(batch).await.expect("commit");

        // Stale expectation: the record is at version 1
        let mut stale = WriteBatch::new();
        stale.put_vote(VersionCheck::Absent, make_vote(1, 2));
        let err = store.commit(stale).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        let mut setup = WriteBatch::new();
        setup.put_vote(VersionCheck::Absent, make_vote(1, 2));
        store.commit(setup).await.expect("commit");

        // Valid stats bump ordered before a conflicting vote put
        let mut batch = WriteBatch::new();
        batch.bump_stats(UserId(9), StatsDelta::reputation(10));
        batch.put_vote(VersionCheck::Absent, make_vote(1, 2));
        assert!(store.commit(batch).await.is_err());

        let stats = store.stats(UserId(9)).await.expect("stats");
        assert_eq!(stats.reputation, 0);
    }

    #[tokio::test]
    async fn test_bumps_accumulate() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            let mut batch = WriteBatch::new();
            batch.bump_score(
                ContentId(5),
                ContentKind::Question,
                ScoreDelta {
                    score: 2,
                    upvotes: 1,
                    downvotes: 0,
                },
            );
            store.commit(batch).await.expect("commit");
        }

        let score = store
            .target_score(ContentId(5), ContentKind::Question)
            .await
            .expect("score");
        assert_eq!(score.score, 6);
        assert_eq!(score.upvotes, 3);
    }

    #[tokio::test]
    async fn test_events_page_newest_first() {
        let store = MemoryStore::new();
        let ids = store.allocate_event_ids(5).await.expect("ids");
        for (i, id) in ids.iter().enumerate() {
            let mut batch = WriteBatch::new();
            batch.append_event(make_event(*id, 1, i as i64));
            store.commit(batch).await.expect("commit");
        }

        let page = store.events_page(UserId(1), 0, 2).await.expect("page");
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, ids[4]);
        assert_eq!(page.items[1].id, ids[3]);

        let last = store.events_page(UserId(1), 2, 2).await.expect("page");
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_mark_reversed_conflicts_when_already_reversed() {
        let store = MemoryStore::new();
        let ids = store.allocate_event_ids(1).await.expect("ids");
        let mut batch = WriteBatch::new();
        batch.append_event(make_event(ids[0], 1, 10));
        store.commit(batch).await.expect("commit");

        let mut first = WriteBatch::new();
        first.mark_reversed(ids[0], Timestamp(50));
        store.commit(first).await.expect("commit");

        let mut second = WriteBatch::new();
        second.mark_reversed(ids[0], Timestamp(60));
        let err = store.commit(second).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_award_badge_idempotent() {
        use commio_types::BadgeId;

        let store = MemoryStore::new();
        let grant = UserBadge {
            user: UserId(1),
            badge: BadgeId(3),
            earned_at: Timestamp(10),
        };

        for _ in 0..2 {
            let mut batch = WriteBatch::new();
            batch.award_badge(grant.clone());
            store.commit(batch).await.expect("commit");
        }

        let held = store.badges(UserId(1)).await.expect("badges");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].earned_at, Timestamp(10));
    }

    #[tokio::test]
    async fn test_allocate_ids_monotonic() {
        let store = MemoryStore::new();
        let first = store.allocate_event_ids(3).await.expect("ids");
        let second = store.allocate_event_ids(2).await.expect("ids");

        assert_eq!(first, vec![EventId(1), EventId(2), EventId(3)]);
        assert_eq!(second, vec![EventId(4), EventId(5)]);
    }
}
