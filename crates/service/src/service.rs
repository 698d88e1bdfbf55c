//! The reputation service facade.

use crate::api::{ContentCommand, ContentReceipt, Standing, VoteReceipt};
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::locks::{KeyedLocks, LockKey};
use crate::metrics::{MetricsError, ServiceMetrics};
use commio_badges::evaluate;
use commio_credits::CreditAccount;
use commio_reputation::{compensating_event, recompute, scored_event, ReputationError};
use commio_store::{LedgerStore, StoreError, VersionCheck, WriteBatch};
use commio_types::{
    BadgeId, ContentAction, EventId, Page, ReputationAction, ReputationEvent, StatsDelta,
    Timestamp, UserBadge, UserId, UserStats, VoteDirection,
};
use commio_votes::{plan, VoteAction, VoteCommand};
use prometheus::Registry;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest accepted history page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Facade over the vote store, credit ledger, accumulator, and badge
/// evaluator.
///
/// Every command runs as one atomic unit: effects are staged into a single
/// store batch and committed together, so concurrent readers never observe
/// a vote counted without its credits spent or its reputation applied.
pub struct ReputationService {
    store: Arc<dyn LedgerStore>,
    config: ServiceConfig,
    locks: KeyedLocks,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl ReputationService {
    /// Create a service over a store.
    pub fn new(store: Arc<dyn LedgerStore>, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            locks: KeyedLocks::new(),
            metrics: None,
        }
    }

    /// Attach Prometheus metrics.
    pub fn with_metrics(mut self, registry: &Registry) -> Result<Self, MetricsError> {
        self.metrics = Some(Arc::new(ServiceMetrics::new(registry)?));
        Ok(self)
    }

    /// The active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Process a vote command.
    ///
    /// Serializes with other operations by the same voter on the same
    /// target; retries version conflicts up to the configured budget.
    pub async fn cast_vote(&self, cmd: VoteCommand) -> ServiceResult<VoteReceipt> {
        let _guard = self
            .locks
            .acquire(LockKey::Vote(cmd.voter, cmd.target, cmd.kind))
            .await;

        let receipt = self
            .with_retry("cast_vote", |now| self.try_cast_vote(cmd, now))
            .await?;

        if let Some(metrics) = &self.metrics {
            metrics
                .votes_total
                .with_label_values(&[action_label(receipt.action)])
                .inc();
            metrics
                .badges_awarded_total
                .inc_by(receipt.newly_awarded.len() as u64);
        }
        Ok(receipt)
    }

    /// Record a non-vote scored action.
    pub async fn on_content_event(&self, cmd: ContentCommand) -> ServiceResult<ContentReceipt> {
        let _guard = self.locks.acquire(LockKey::User(cmd.user)).await;
        let receipt = self
            .with_retry("on_content_event", |now| self.try_content_event(cmd, now))
            .await?;

        if let Some(metrics) = &self.metrics {
            metrics
                .badges_awarded_total
                .inc_by(receipt.newly_awarded.len() as u64);
        }
        Ok(receipt)
    }

    /// Reverse a reputation event by appending its compensation.
    ///
    /// Fails with [`ReputationError::AlreadyReversed`] on a second reversal;
    /// the total is left exactly as after the first.
    pub async fn reverse_event(&self, event: EventId) -> ServiceResult<ContentReceipt> {
        let owner = self
            .store
            .event(event)
            .await?
            .ok_or(ReputationError::UnknownEvent { event })?
            .user;

        let _guard = self.locks.acquire(LockKey::User(owner)).await;
        self.with_retry("reverse_event", |now| self.try_reverse_event(event, now))
            .await
    }

    /// Read-only composite view of a user's standing.
    pub async fn get_standing(&self, user: UserId) -> ServiceResult<Standing> {
        let stats = self.store.stats(user).await?;
        let badges = self.store.badges(user).await?;
        let credit_balance = self.credit_balance(user).await?;

        Ok(Standing {
            reputation: stats.reputation,
            badges,
            credit_balance,
        })
    }

    /// One page of a user's reputation history, newest-first.
    pub async fn get_history(
        &self,
        user: UserId,
        page: u32,
        limit: u32,
    ) -> ServiceResult<Page<ReputationEvent>> {
        let limit = limit.min(MAX_PAGE_LIMIT);
        Ok(self.store.events_page(user, page, limit).await?)
    }

    /// Badges a user holds.
    pub async fn get_badges(&self, user: UserId) -> ServiceResult<Vec<UserBadge>> {
        Ok(self.store.badges(user).await?)
    }

    /// The static privilege-threshold table.
    pub fn get_privileges(&self) -> &crate::config::PrivilegeTable {
        &self.config.privileges
    }

    /// Apply the periodic credit grant for the period containing `at`.
    ///
    /// Idempotent per period: repeated calls within one period change
    /// nothing. Returns the balance after the call.
    pub async fn refill_credits(&self, user: UserId, at: Timestamp) -> ServiceResult<u64> {
        let _guard = self.locks.acquire(LockKey::User(user)).await;
        self.with_retry("refill_credits", |_| self.try_refill(user, at))
            .await
    }

    /// Ground-truth reputation total folded from the full event log.
    ///
    /// The cached total must equal this; drift indicates a bug.
    pub async fn recompute(&self, user: UserId) -> ServiceResult<i64> {
        let events = self.store.events(user).await?;
        Ok(recompute(&events))
    }

    /// Rebuild the cached total from the log, warning on drift.
    pub async fn reconcile(&self, user: UserId) -> ServiceResult<i64> {
        let _guard = self.locks.acquire(LockKey::User(user)).await;

        let truth = {
            let events = self.store.events(user).await?;
            recompute(&events)
        };
        let cached = self.store.stats(user).await?.reputation;

        if cached != truth {
            warn!("reputation cache drift for {user}: cached {cached}, log {truth}");
            let mut batch = WriteBatch::new();
            batch.bump_stats(user, StatsDelta::reputation(truth - cached));
            self.store.commit(batch).await?;
        }
        Ok(truth)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn with_retry<T, F, Fut>(&self, operation: &str, attempt_fn: F) -> ServiceResult<T>
    where
        F: Fn(Timestamp) -> Fut,
        Fut: std::future::Future<Output = ServiceResult<T>>,
    {
        let attempts = self.config.retry.max_attempts.max(1);
        for attempt in 1..=attempts {
            match attempt_fn(Timestamp::now()).await {
                Err(ServiceError::Store(err)) if err.is_retryable() => {
                    debug!("{operation}: conflict on attempt {attempt}: {err}");
                    if let Some(metrics) = &self.metrics {
                        metrics.conflict_retries_total.inc();
                    }
                }
                other => return other,
            }
        }

        warn!("{operation}: retry budget of {attempts} exhausted");
        Err(ServiceError::ConcurrencyConflict { attempts })
    }

    async fn try_cast_vote(&self, cmd: VoteCommand, now: Timestamp) -> ServiceResult<VoteReceipt> {
        let existing = self.store.vote(cmd.voter, cmd.target, cmd.kind).await?;
        let vote_plan = plan(existing.as_ref().map(|v| &v.value), &cmd, now)?;

        let mut record = match (vote_plan.action, vote_plan.record.clone()) {
            (VoteAction::Noop, record) => {
                let target = self.store.target_score(cmd.target, cmd.kind).await?;
                let voter_balance = self.credit_balance(cmd.voter).await?;
                return Ok(VoteReceipt {
                    action: VoteAction::Noop,
                    vote: record,
                    target,
                    voter_balance,
                    newly_awarded: Vec::new(),
                });
            }
            (_, Some(record)) => record,
            // plan() always carries a record for a non-noop transition
            (_, None) => {
                return Err(ServiceError::Store(StoreError::Backend(
                    "vote plan without record".to_string(),
                )))
            }
        };

        let mut batch = WriteBatch::new();

        // Credits: spend newly weighted cost, refund cleared cost.
        let (mut account, credit_check) = self.load_account(cmd.voter).await?;
        if vote_plan.credit_charge > 0 {
            account.spend(vote_plan.credit_charge)?;
        }
        if vote_plan.credit_refund > 0 {
            let outcome = account.refund(vote_plan.credit_refund);
            if let Some(report) = outcome.inconsistency {
                warn!("credit refund clamped: {report}");
                if let Some(metrics) = &self.metrics {
                    metrics.ledger_inconsistencies_total.inc();
                }
            }
        }
        if vote_plan.credit_charge > 0 || vote_plan.credit_refund > 0 {
            batch.put_credit(credit_check, account.clone());
        }
        let voter_balance = account.balance();

        // Reputation events for the content author (and, when configured,
        // the downvoting voter). A direction change compensates the old
        // event and appends the new one in the same batch.
        let mut author_delta = StatsDelta::default();
        let mut voter_delta = StatsDelta::default();

        let direction_changed = !matches!(vote_plan.action, VoteAction::Reweighted);
        if direction_changed {
            let old_author_event = record.author_event.take();
            let old_voter_event = record.voter_event.take();

            let new_author = match record.direction {
                VoteDirection::Up => Some((
                    ReputationAction::UpvoteReceived,
                    self.config.points.upvote_received,
                )),
                VoteDirection::Down => Some((
                    ReputationAction::DownvoteReceived,
                    self.config.points.downvote_received,
                )),
                VoteDirection::None => None,
            };
            let new_voter = (record.direction == VoteDirection::Down
                && self.config.points.downvote_cast != 0)
                .then_some((
                    ReputationAction::DownvoteCast,
                    self.config.points.downvote_cast,
                ));

            let count = old_author_event.is_some() as u32
                + old_voter_event.is_some() as u32
                + new_author.is_some() as u32
                + new_voter.is_some() as u32;
            let mut ids = self.store.allocate_event_ids(count).await?.into_iter();

            if let Some(original) = old_author_event {
                self.stage_compensation(&mut batch, &mut author_delta, original, &mut ids, now)
                    .await?;
            }
            if let Some(original) = old_voter_event {
                self.stage_compensation(&mut batch, &mut voter_delta, original, &mut ids, now)
                    .await?;
            }
            if let Some((action, points)) = new_author {
                let event = scored_event(
                    take_id(&mut ids)?,
                    cmd.author,
                    action,
                    points,
                    Some(cmd.target),
                    now,
                );
                record.author_event = Some(event.id);
                author_delta.reputation += points;
                author_delta.merge(&counter_delta(action, 1));
                batch.append_event(event);
            }
            if let Some((action, points)) = new_voter {
                let event = scored_event(
                    take_id(&mut ids)?,
                    cmd.voter,
                    action,
                    points,
                    Some(cmd.target),
                    now,
                );
                record.voter_event = Some(event.id);
                voter_delta.reputation += points;
                batch.append_event(event);
            }
        }

        if vote_plan.action == VoteAction::Cast {
            voter_delta.votes_cast += 1;
        }

        let vote_check = match (vote_plan.creates_record, &existing) {
            (true, _) => VersionCheck::Absent,
            (false, Some(versioned)) => VersionCheck::Is(versioned.version),
            // An updating plan always came from an existing record
            (false, None) => VersionCheck::Absent,
        };
        batch.put_vote(vote_check, record.clone());

        if !vote_plan.score.is_zero() {
            batch.bump_score(cmd.target, cmd.kind, vote_plan.score);
        }

        // Badge thresholds are re-checked against the post-update stats of
        // every user this vote touched, inside the same commit.
        let mut newly_awarded = Vec::new();
        for (user, delta) in [(cmd.author, &author_delta), (cmd.voter, &voter_delta)] {
            if delta.is_zero() {
                continue;
            }
            batch.bump_stats(user, *delta);
            let awarded = self.stage_badges(&mut batch, user, delta, now).await?;
            newly_awarded.extend(awarded);
        }

        self.store.commit(batch).await?;
        debug!(
            "vote {:?} by {} on {} ({:+} score)",
            vote_plan.action, cmd.voter, cmd.target, vote_plan.score.score
        );

        let target = self.store.target_score(cmd.target, cmd.kind).await?;
        Ok(VoteReceipt {
            action: vote_plan.action,
            vote: Some(record),
            target,
            voter_balance,
            newly_awarded,
        })
    }

    async fn try_content_event(
        &self,
        cmd: ContentCommand,
        now: Timestamp,
    ) -> ServiceResult<ContentReceipt> {
        let action = cmd.action.action();
        let points = match cmd.action {
            ContentAction::Bounty { points } => points,
            _ => self.config.points.points_for(action).unwrap_or_default(),
        };

        let ids = self.store.allocate_event_ids(1).await?;
        let event = scored_event(
            take_id(&mut ids.into_iter())?,
            cmd.user,
            action,
            points,
            Some(cmd.source),
            now,
        );
        let event_id = event.id;

        let mut delta = StatsDelta::reputation(points);
        delta.merge(&counter_delta(action, 1));

        let mut batch = WriteBatch::new();
        batch.append_event(event);
        batch.bump_stats(cmd.user, delta);
        let newly_awarded = self.stage_badges(&mut batch, cmd.user, &delta, now).await?;

        self.store.commit(batch).await?;
        debug!("content event {action:?} for {} ({points:+})", cmd.user);

        let reputation = self.store.stats(cmd.user).await?.reputation;
        Ok(ContentReceipt {
            event: event_id,
            reputation,
            newly_awarded,
        })
    }

    async fn try_reverse_event(
        &self,
        event: EventId,
        now: Timestamp,
    ) -> ServiceResult<ContentReceipt> {
        let original = self
            .store
            .event(event)
            .await?
            .ok_or(ReputationError::UnknownEvent { event })?;

        let ids = self.store.allocate_event_ids(1).await?;
        let compensation = compensating_event(take_id(&mut ids.into_iter())?, &original, now)?;
        let compensation_id = compensation.id;

        let mut delta = StatsDelta::reputation(compensation.points);
        delta.merge(&counter_delta(original.action, -1));

        let mut batch = WriteBatch::new();
        batch.mark_reversed(original.id, now);
        batch.append_event(compensation);
        batch.bump_stats(original.user, delta);
        let newly_awarded = self
            .stage_badges(&mut batch, original.user, &delta, now)
            .await?;

        self.store.commit(batch).await?;
        info!("reversed event {} for {}", original.id, original.user);

        let reputation = self.store.stats(original.user).await?.reputation;
        Ok(ContentReceipt {
            event: compensation_id,
            reputation,
            newly_awarded,
        })
    }

    async fn try_refill(&self, user: UserId, at: Timestamp) -> ServiceResult<u64> {
        use commio_credits::RefillOutcome;

        let (mut account, check) = self.load_account(user).await?;
        let period = at.period_index(self.config.credits.refill_period);

        match account.refill(self.config.credits.refill_amount, period) {
            RefillOutcome::AlreadyGranted => Ok(account.balance()),
            RefillOutcome::Granted => {
                let balance = account.balance();
                let mut batch = WriteBatch::new();
                batch.put_credit(check, account);
                self.store.commit(batch).await?;
                info!("refilled {} credits for {user} (period {period})", self.config.credits.refill_amount);
                Ok(balance)
            }
        }
    }

    /// Compensate an event backing a vote that is being replaced or
    /// cleared. A reversal that already happened elsewhere is tolerated:
    /// the points are neutralized either way.
    async fn stage_compensation(
        &self,
        batch: &mut WriteBatch,
        delta: &mut StatsDelta,
        original_id: EventId,
        ids: &mut std::vec::IntoIter<EventId>,
        now: Timestamp,
    ) -> ServiceResult<()> {
        let original = self
            .store
            .event(original_id)
            .await?
            .ok_or(ReputationError::UnknownEvent { event: original_id })?;

        match compensating_event(take_id(ids)?, &original, now) {
            Ok(compensation) => {
                delta.reputation += compensation.points;
                delta.merge(&counter_delta(original.action, -1));
                batch.mark_reversed(original.id, now);
                batch.append_event(compensation);
                Ok(())
            }
            Err(ReputationError::AlreadyReversed { event }) => {
                warn!("vote-backed event {event} was already reversed; skipping compensation");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Evaluate badges against the post-delta stats and stage awards.
    async fn stage_badges(
        &self,
        batch: &mut WriteBatch,
        user: UserId,
        delta: &StatsDelta,
        now: Timestamp,
    ) -> ServiceResult<Vec<UserBadge>> {
        let mut stats: UserStats = self.store.stats(user).await?;
        stats.apply(delta);

        let held: HashSet<BadgeId> = self
            .store
            .badges(user)
            .await?
            .iter()
            .map(|b| b.badge)
            .collect();

        let mut awarded = Vec::new();
        for badge in evaluate(&self.config.catalog, &stats, &held) {
            let grant = UserBadge {
                user,
                badge,
                earned_at: now,
            };
            info!("awarding {badge} to {user}");
            batch.award_badge(grant.clone());
            awarded.push(grant);
        }
        Ok(awarded)
    }

    async fn load_account(&self, user: UserId) -> ServiceResult<(CreditAccount, VersionCheck)> {
        Ok(match self.store.credit_account(user).await? {
            Some(versioned) => (versioned.value, VersionCheck::Is(versioned.version)),
            None => (
                CreditAccount::new(user, self.config.credits.initial_balance),
                VersionCheck::Absent,
            ),
        })
    }

    async fn credit_balance(&self, user: UserId) -> ServiceResult<u64> {
        Ok(self
            .store
            .credit_account(user)
            .await?
            .map(|v| v.value.balance())
            .unwrap_or(self.config.credits.initial_balance))
    }
}

fn take_id(ids: &mut std::vec::IntoIter<EventId>) -> ServiceResult<EventId> {
    ids.next().ok_or_else(|| {
        ServiceError::Store(StoreError::Backend(
            "event id allocation mismatch".to_string(),
        ))
    })
}

/// Activity-counter contribution of an action, with `sign` +1 on apply and
/// -1 on reversal.
fn counter_delta(action: ReputationAction, sign: i32) -> StatsDelta {
    let mut delta = StatsDelta::default();
    match action {
        ReputationAction::Question => delta.questions = sign,
        ReputationAction::Answer => delta.answers = sign,
        ReputationAction::Comment => delta.comments = sign,
        ReputationAction::AcceptedAnswer => delta.accepted_answers = sign,
        ReputationAction::UpvoteReceived => delta.upvotes_received = sign,
        ReputationAction::DownvoteReceived
        | ReputationAction::Bounty
        | ReputationAction::DownvoteCast
        | ReputationAction::Reversal => {}
    }
    delta
}

fn action_label(action: VoteAction) -> &'static str {
    match action {
        VoteAction::Cast => "cast",
        VoteAction::Toggled => "toggled",
        VoteAction::Reweighted => "reweighted",
        VoteAction::Cleared => "cleared",
        VoteAction::Noop => "noop",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_delta_reverses_cleanly() {
        let forward = counter_delta(ReputationAction::AcceptedAnswer, 1);
        let mut back = forward;
        back.merge(&counter_delta(ReputationAction::AcceptedAnswer, -1));
        assert!(back.is_zero());
        assert_eq!(forward.accepted_answers, 1);
    }

    #[test]
    fn test_action_labels_distinct() {
        let labels = [
            action_label(VoteAction::Cast),
            action_label(VoteAction::Toggled),
            action_label(VoteAction::Reweighted),
            action_label(VoteAction::Cleared),
            action_label(VoteAction::Noop),
        ];
        let unique: HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
