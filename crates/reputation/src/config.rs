//! Point values per scored action.

use commio_types::ReputationAction;
use serde::{Deserialize, Serialize};

/// Points granted (or charged) per reputation action.
///
/// The accumulator looks values up here; nothing scores inline. Bounty
/// points are variable and carried on the command, so
/// [`PointsConfig::points_for`] returns `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Posting a question.
    pub question: i64,
    /// Posting an answer.
    pub answer: i64,
    /// Posting a comment.
    pub comment: i64,
    /// Receiving an upvote on own content.
    pub upvote_received: i64,
    /// Receiving a downvote on own content.
    pub downvote_received: i64,
    /// Having an answer accepted.
    pub accepted_answer: i64,
    /// Cost to the voter for casting a downvote. Zero disables the charge.
    pub downvote_cast: i64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            question: 5,
            answer: 10,
            comment: 2,
            upvote_received: 10,
            downvote_received: -2,
            accepted_answer: 15,
            downvote_cast: 0,
        }
    }
}

impl PointsConfig {
    /// Fixed point value for an action.
    ///
    /// Returns `None` for actions whose points are supplied by the caller
    /// (bounties) or derived from another event (reversals).
    pub fn points_for(&self, action: ReputationAction) -> Option<i64> {
        match action {
            ReputationAction::Question => Some(self.question),
            ReputationAction::Answer => Some(self.answer),
            ReputationAction::Comment => Some(self.comment),
            ReputationAction::UpvoteReceived => Some(self.upvote_received),
            ReputationAction::DownvoteReceived => Some(self.downvote_received),
            ReputationAction::AcceptedAnswer => Some(self.accepted_answer),
            ReputationAction::DownvoteCast => Some(self.downvote_cast),
            ReputationAction::Bounty | ReputationAction::Reversal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PointsConfig::default();

        assert_eq!(config.question, 5);
        assert_eq!(config.answer, 10);
        assert_eq!(config.comment, 2);
        assert_eq!(config.upvote_received, 10);
        assert_eq!(config.downvote_received, -2);
        assert_eq!(config.accepted_answer, 15);
        assert_eq!(config.downvote_cast, 0);
    }

    #[test]
    fn test_points_lookup() {
        let config = PointsConfig::default();

        assert_eq!(
            config.points_for(ReputationAction::AcceptedAnswer),
            Some(15)
        );
        assert_eq!(config.points_for(ReputationAction::Bounty), None);
        assert_eq!(config.points_for(ReputationAction::Reversal), None);
    }

    #[test]
    fn test_config_serialization() {
        let config = PointsConfig {
            downvote_cast: -1,
            ..PointsConfig::default()
        };

        let json = serde_json::to_string(&config).expect("serialize");
        let back: PointsConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
