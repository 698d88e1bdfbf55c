//! Core types for the Community.io reputation ledger
//!
//! This crate provides shared type definitions used across all ledger
//! components: identifiers, vote and reputation records, activity counters,
//! and the delta types the store applies atomically.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// Unique identifier for a piece of content (question, answer, or comment)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(pub u64);

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// Unique identifier for a reputation event in the append-only log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

/// Unique identifier for a badge definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BadgeId(pub u32);

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BadgeId({})", self.0)
    }
}

/// Milliseconds since the Unix epoch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current wall-clock time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Index of the fixed-length period this timestamp falls in
    ///
    /// Used as the idempotence key for periodic credit refills. Periods of
    /// zero length collapse to a single index.
    pub fn period_index(&self, period: Duration) -> u64 {
        let period_ms = period.as_millis() as i64;
        if period_ms <= 0 {
            return 0;
        }
        (self.0.max(0) / period_ms) as u64
    }
}

/// Kind of content a vote targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// A question post
    Question,
    /// An answer post
    Answer,
    /// A comment
    Comment,
}

/// Direction of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    /// Upvote
    Up,
    /// Downvote
    Down,
    /// No active vote (a cleared vote)
    None,
}

impl VoteDirection {
    /// Sign this direction contributes to a target's score
    pub fn score_sign(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
            VoteDirection::None => 0,
        }
    }

    /// Whether this direction represents an active vote
    pub fn is_active(&self) -> bool {
        !matches!(self, VoteDirection::None)
    }
}

/// Scored action recorded in the reputation event log
///
/// A closed set: the accumulator looks point values up per variant rather
/// than interpreting free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReputationAction {
    /// Posted a question
    Question,
    /// Posted an answer
    Answer,
    /// Posted a comment
    Comment,
    /// Received an upvote on own content
    UpvoteReceived,
    /// Received a downvote on own content
    DownvoteReceived,
    /// Own answer was accepted
    AcceptedAnswer,
    /// Received a bounty (points carried on the event)
    Bounty,
    /// Cast a downvote (voter-side cost, configurable)
    DownvoteCast,
    /// Compensating entry reversing an earlier event
    Reversal,
}

/// Non-vote scored command accepted by the facade
///
/// Distinct from [`ReputationAction`] so callers cannot submit vote-derived
/// or reversal actions directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentAction {
    /// User posted a question
    Question,
    /// User posted an answer
    Answer,
    /// User posted a comment
    Comment,
    /// User's answer was accepted
    AcceptedAnswer,
    /// User received a bounty of the given points
    Bounty {
        /// Bounty points, set by the granting caller
        points: i64,
    },
}

impl ContentAction {
    /// The reputation action recorded for this command
    pub fn action(&self) -> ReputationAction {
        match self {
            ContentAction::Question => ReputationAction::Question,
            ContentAction::Answer => ReputationAction::Answer,
            ContentAction::Comment => ReputationAction::Comment,
            ContentAction::AcceptedAnswer => ReputationAction::AcceptedAnswer,
            ContentAction::Bounty { .. } => ReputationAction::Bounty,
        }
    }
}

/// One voter's vote on one target
///
/// Unique per (voter, target, kind). Mutated in place on toggle or clear,
/// never duplicated. A cleared vote keeps its row with direction `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// The voting user
    pub voter: UserId,
    /// The content voted on
    pub target: ContentId,
    /// Kind of the target content
    pub kind: ContentKind,
    /// Current direction (`None` once cleared)
    pub direction: VoteDirection,
    /// Vote weight (quadratic credit cost is weight squared)
    pub weight: u32,
    /// Author-side reputation event backing the active vote
    pub author_event: Option<EventId>,
    /// Voter-side reputation event (downvote cost), if configured
    pub voter_event: Option<EventId>,
    /// When the record was first created
    pub created_at: Timestamp,
    /// When the record last changed
    pub updated_at: Timestamp,
}

impl VoteRecord {
    /// Whether this record currently counts toward the target's score
    pub fn is_active(&self) -> bool {
        self.direction.is_active()
    }
}

/// One entry in the append-only reputation log
///
/// Immutable once created except for the reversal marker. Reversal appends
/// a compensating entry (action [`ReputationAction::Reversal`]) with negated
/// points and stamps `reversed_at` on the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEvent {
    /// Event id, allocated by the store
    pub id: EventId,
    /// User whose reputation this event affects
    pub user: UserId,
    /// What happened
    pub action: ReputationAction,
    /// Signed point delta
    pub points: i64,
    /// Content the event originated from, if any
    pub source: Option<ContentId>,
    /// When the event was recorded
    pub created_at: Timestamp,
    /// Set once a compensating event has been appended for this one
    pub reversed_at: Option<Timestamp>,
    /// For compensating events, the event being reversed
    pub reverses: Option<EventId>,
}

impl ReputationEvent {
    /// Whether this event has already been reversed
    pub fn is_reversed(&self) -> bool {
        self.reversed_at.is_some()
    }

    /// Whether this event is itself a compensating entry
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }
}

/// A badge held by a user
///
/// Unique per (user, badge): a badge is awarded at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBadge {
    /// Holder
    pub user: UserId,
    /// Badge definition
    pub badge: BadgeId,
    /// When the badge was awarded
    pub earned_at: Timestamp,
}

/// Snapshot of a user's standing and activity counters
///
/// `reputation` is a materialized cache over the event log, never the source
/// of truth; the counters feed badge threshold rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserStats {
    /// Cached reputation total
    pub reputation: i64,
    /// Questions posted
    pub questions: u32,
    /// Answers posted
    pub answers: u32,
    /// Comments posted
    pub comments: u32,
    /// Own answers accepted
    pub accepted_answers: u32,
    /// Upvotes received on own content
    pub upvotes_received: u32,
    /// Votes cast on others' content
    pub votes_cast: u32,
}

impl UserStats {
    /// Apply a signed delta, saturating counters at zero
    pub fn apply(&mut self, delta: &StatsDelta) {
        self.reputation += delta.reputation;
        self.questions = add_signed(self.questions, delta.questions);
        self.answers = add_signed(self.answers, delta.answers);
        self.comments = add_signed(self.comments, delta.comments);
        self.accepted_answers = add_signed(self.accepted_answers, delta.accepted_answers);
        self.upvotes_received = add_signed(self.upvotes_received, delta.upvotes_received);
        self.votes_cast = add_signed(self.votes_cast, delta.votes_cast);
    }
}

fn add_signed(counter: u32, delta: i32) -> u32 {
    if delta >= 0 {
        counter.saturating_add(delta as u32)
    } else {
        counter.saturating_sub(delta.unsigned_abs())
    }
}

/// Signed change to a user's stats, applied atomically by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatsDelta {
    /// Reputation change
    pub reputation: i64,
    /// Questions-posted change
    pub questions: i32,
    /// Answers-posted change
    pub answers: i32,
    /// Comments-posted change
    pub comments: i32,
    /// Accepted-answers change
    pub accepted_answers: i32,
    /// Upvotes-received change
    pub upvotes_received: i32,
    /// Votes-cast change
    pub votes_cast: i32,
}

impl StatsDelta {
    /// Delta affecting reputation only
    pub fn reputation(points: i64) -> Self {
        Self {
            reputation: points,
            ..Self::default()
        }
    }

    /// Whether applying this delta changes anything
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Merge another delta into this one
    pub fn merge(&mut self, other: &StatsDelta) {
        self.reputation += other.reputation;
        self.questions += other.questions;
        self.answers += other.answers;
        self.comments += other.comments;
        self.accepted_answers += other.accepted_answers;
        self.upvotes_received += other.upvotes_received;
        self.votes_cast += other.votes_cast;
    }
}

/// Aggregate vote tally for one target
///
/// Updated only by atomic increments inside a store commit, never by
/// read-modify-write of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetScore {
    /// The content
    pub target: ContentId,
    /// Kind of the content
    pub kind: ContentKind,
    /// Net weighted score
    pub score: i64,
    /// Active upvote count
    pub upvotes: u32,
    /// Active downvote count
    pub downvotes: u32,
}

impl TargetScore {
    /// Zeroed tally for a target
    pub fn new(target: ContentId, kind: ContentKind) -> Self {
        Self {
            target,
            kind,
            score: 0,
            upvotes: 0,
            downvotes: 0,
        }
    }

    /// Apply a signed delta, saturating counters at zero
    pub fn apply(&mut self, delta: &ScoreDelta) {
        self.score += delta.score;
        self.upvotes = add_signed(self.upvotes, delta.upvotes);
        self.downvotes = add_signed(self.downvotes, delta.downvotes);
    }
}

/// Signed change to a target's tally, applied atomically by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreDelta {
    /// Net score change
    pub score: i64,
    /// Upvote count change
    pub upvotes: i32,
    /// Downvote count change
    pub downvotes: i32,
}

impl ScoreDelta {
    /// Whether applying this delta changes anything
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// One page of results, newest-first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Zero-based page number
    pub page: u32,
    /// Requested page size
    pub limit: u32,
    /// Total items across all pages
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(UserId(7).to_string(), "UserId(7)");
        assert_eq!(ContentId(3).to_string(), "ContentId(3)");
        assert_eq!(EventId(11).to_string(), "EventId(11)");
    }

    #[test]
    fn test_period_index() {
        let week = Duration::from_secs(7 * 24 * 3600);
        let t0 = Timestamp(0);
        let t1 = Timestamp(week.as_millis() as i64 - 1);
        let t2 = Timestamp(week.as_millis() as i64);

        assert_eq!(t0.period_index(week), 0);
        assert_eq!(t1.period_index(week), 0);
        assert_eq!(t2.period_index(week), 1);
        assert_eq!(t0.period_index(Duration::ZERO), 0);
    }

    #[test]
    fn test_stats_apply_saturates() {
        let mut stats = UserStats::default();
        stats.apply(&StatsDelta {
            reputation: -5,
            questions: -3,
            ..StatsDelta::default()
        });

        // Reputation may go negative; counters saturate at zero
        assert_eq!(stats.reputation, -5);
        assert_eq!(stats.questions, 0);
    }

    #[test]
    fn test_score_apply() {
        let mut score = TargetScore::new(ContentId(1), ContentKind::Answer);
        score.apply(&ScoreDelta {
            score: 2,
            upvotes: 1,
            downvotes: 0,
        });
        score.apply(&ScoreDelta {
            score: -4,
            upvotes: -1,
            downvotes: 1,
        });

        assert_eq!(score.score, -2);
        assert_eq!(score.upvotes, 0);
        assert_eq!(score.downvotes, 1);
    }

    #[test]
    fn test_vote_record_serialization() {
        let record = VoteRecord {
            voter: UserId(1),
            target: ContentId(2),
            kind: ContentKind::Answer,
            direction: VoteDirection::Up,
            weight: 2,
            author_event: Some(EventId(9)),
            voter_event: None,
            created_at: Timestamp(1_000),
            updated_at: Timestamp(2_000),
        };

        let json = serde_json::to_string(&record).expect("serialize");
        let back: VoteRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn test_content_action_mapping() {
        assert_eq!(
            ContentAction::AcceptedAnswer.action(),
            ReputationAction::AcceptedAnswer
        );
        assert_eq!(
            ContentAction::Bounty { points: 50 }.action(),
            ReputationAction::Bounty
        );
    }
}
