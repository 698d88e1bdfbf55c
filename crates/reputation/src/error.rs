//! Error types for reputation accumulation.

use commio_types::EventId;
use thiserror::Error;

/// Errors from event application and reversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReputationError {
    /// The event was already reversed; a second reversal is a caller bug.
    #[error("event {event} is already reversed")]
    AlreadyReversed {
        /// The event a reversal was attempted on.
        event: EventId,
    },

    /// Compensating events cannot themselves be reversed.
    #[error("event {event} is a reversal and cannot be reversed")]
    NotReversible {
        /// The compensating event.
        event: EventId,
    },

    /// No event with this id exists in the log.
    #[error("unknown reputation event {event}")]
    UnknownEvent {
        /// The missing event id.
        event: EventId,
    },
}

/// Result type alias for reputation operations.
pub type ReputationResult<T> = Result<T, ReputationError>;
