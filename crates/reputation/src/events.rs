//! Event construction and log folding.
//!
//! The log is the source of truth. Both builders return complete events for
//! the caller to append; neither mutates anything.

use crate::error::{ReputationError, ReputationResult};
use commio_types::{ContentId, EventId, ReputationAction, ReputationEvent, Timestamp, UserId};

/// Build a scored event for a user action.
pub fn scored_event(
    id: EventId,
    user: UserId,
    action: ReputationAction,
    points: i64,
    source: Option<ContentId>,
    at: Timestamp,
) -> ReputationEvent {
    ReputationEvent {
        id,
        user,
        action,
        points,
        source,
        created_at: at,
        reversed_at: None,
        reverses: None,
    }
}

/// Build the compensating event that reverses `original`.
///
/// Fails with [`ReputationError::AlreadyReversed`] if a compensation was
/// already recorded, and [`ReputationError::NotReversible`] for events that
/// are themselves compensations. The caller appends the returned event and
/// stamps `reversed_at` on the original in the same transaction.
pub fn compensating_event(
    id: EventId,
    original: &ReputationEvent,
    at: Timestamp,
) -> ReputationResult<ReputationEvent> {
    if original.is_reversal() {
        return Err(ReputationError::NotReversible { event: original.id });
    }
    if original.is_reversed() {
        return Err(ReputationError::AlreadyReversed { event: original.id });
    }

    Ok(ReputationEvent {
        id,
        user: original.user,
        action: ReputationAction::Reversal,
        points: -original.points,
        source: original.source,
        created_at: at,
        reversed_at: None,
        reverses: Some(original.id),
    })
}

/// Fold a user's full event log into the ground-truth reputation total.
///
/// Compensating events carry negated points, so a plain sum cancels every
/// reversed pair. The cached total must always equal this fold.
pub fn recompute(events: &[ReputationEvent]) -> i64 {
    events.iter().map(|e| e.points).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(id: u64, points: i64) -> ReputationEvent {
        scored_event(
            EventId(id),
            UserId(1),
            ReputationAction::Answer,
            points,
            Some(ContentId(5)),
            Timestamp(id as i64),
        )
    }

    #[test]
    fn test_recompute_sums_log() {
        let log = vec![make_event(1, 10), make_event(2, 15), make_event(3, -2)];
        assert_eq!(recompute(&log), 23);
        assert_eq!(recompute(&[]), 0);
    }

    #[test]
    fn test_compensation_cancels_in_recompute() {
        let mut log = vec![make_event(1, 10), make_event(2, 15)];

        let comp =
            compensating_event(EventId(3), &log[0], Timestamp(100)).expect("compensating event");
        assert_eq!(comp.points, -10);
        assert_eq!(comp.reverses, Some(EventId(1)));
        assert_eq!(comp.action, ReputationAction::Reversal);
        assert_eq!(comp.user, log[0].user);

        log[0].reversed_at = Some(Timestamp(100));
        log.push(comp);
        assert_eq!(recompute(&log), 15);
    }

    #[test]
    fn test_double_reversal_rejected() {
        let mut original = make_event(1, 10);
        original.reversed_at = Some(Timestamp(50));

        let err = compensating_event(EventId(2), &original, Timestamp(60)).unwrap_err();
        assert_eq!(
            err,
            ReputationError::AlreadyReversed {
                event: EventId(1)
            }
        );
    }

    #[test]
    fn test_reversal_of_reversal_rejected() {
        let original = make_event(1, 10);
        let comp = compensating_event(EventId(2), &original, Timestamp(50)).expect("comp");

        let err = compensating_event(EventId(3), &comp, Timestamp(60)).unwrap_err();
        assert_eq!(
            err,
            ReputationError::NotReversible {
                event: EventId(2)
            }
        );
    }

    #[test]
    fn test_cache_matches_recompute_across_sequence() {
        // Apply and reverse in an arbitrary order, tracking the cache the way
        // the service does: cache += event.points on every append.
        let mut log: Vec<ReputationEvent> = Vec::new();
        let mut cache = 0i64;
        let mut next_id = 1u64;

        let mut append = |log: &mut Vec<ReputationEvent>, cache: &mut i64, event: ReputationEvent| {
            *cache += event.points;
            log.push(event);
        };

        for points in [5, 10, -2, 15] {
            let event = make_event(next_id, points);
            next_id += 1;
            append(&mut log, &mut cache, event);
        }

        // Reverse the second event
        let comp = compensating_event(EventId(next_id), &log[1], Timestamp(99)).expect("comp");
        log[1].reversed_at = Some(Timestamp(99));
        append(&mut log, &mut cache, comp);

        assert_eq!(cache, recompute(&log));
        assert_eq!(cache, 5 - 2 + 15);
    }
}
