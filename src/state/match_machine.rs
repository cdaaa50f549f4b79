//! Pure legality rules for the match lifecycle. No I/O happens here.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a match. Transitions are monotonic: a match that
/// reached [`MatchStatus::Completed`] or [`MatchStatus::Cancelled`] never
/// re-enters an earlier status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Challenge issued, waiting for the challenged participant to accept.
    Pending,
    /// Both participants in, questions being played.
    Active,
    /// All questions graded; winner (or draw) recorded.
    Completed,
    /// Declined or expired before the match started.
    Cancelled,
}

impl MatchStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

/// The kinds of action a participant can submit against a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Challenged participant accepts the pending challenge.
    Accept,
    /// Challenged participant declines the pending challenge.
    Decline,
    /// Post a chat message.
    Chat,
    /// Claim the right to answer the current question.
    Buzz,
    /// Answer the current question while holding the buzz.
    Answer,
}

impl ActionKind {
    fn label(self) -> &'static str {
        match self {
            ActionKind::Accept => "accept",
            ActionKind::Decline => "decline",
            ActionKind::Chat => "chat",
            ActionKind::Buzz => "buzz",
            ActionKind::Answer => "answer",
        }
    }
}

/// Error returned when an action is not valid for the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("action `{}` is not legal while the match is {status:?}", action.label())]
pub struct IllegalTransition {
    /// Status the match was in when the illegal action arrived.
    pub status: MatchStatus,
    /// The action that cannot be applied from this status.
    pub action: ActionKind,
}

/// Check that `action` may be attempted while the match is in `status`.
///
/// This is only the status-level gate; actor-level rules (only the
/// challenged participant accepts, only the buzz holder answers) are
/// enforced against the match record by the gateway.
pub fn ensure_legal(status: MatchStatus, action: ActionKind) -> Result<(), IllegalTransition> {
    let legal = match action {
        ActionKind::Accept | ActionKind::Decline => status == MatchStatus::Pending,
        ActionKind::Chat => matches!(status, MatchStatus::Pending | MatchStatus::Active),
        ActionKind::Buzz | ActionKind::Answer => status == MatchStatus::Active,
    };

    if legal {
        Ok(())
    } else {
        Err(IllegalTransition { status, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_and_decline_only_while_pending() {
        assert!(ensure_legal(MatchStatus::Pending, ActionKind::Accept).is_ok());
        assert!(ensure_legal(MatchStatus::Pending, ActionKind::Decline).is_ok());

        for status in [
            MatchStatus::Active,
            MatchStatus::Completed,
            MatchStatus::Cancelled,
        ] {
            assert!(ensure_legal(status, ActionKind::Accept).is_err());
            assert!(ensure_legal(status, ActionKind::Decline).is_err());
        }
    }

    #[test]
    fn buzz_and_answer_only_while_active() {
        assert!(ensure_legal(MatchStatus::Active, ActionKind::Buzz).is_ok());
        assert!(ensure_legal(MatchStatus::Active, ActionKind::Answer).is_ok());

        for status in [
            MatchStatus::Pending,
            MatchStatus::Completed,
            MatchStatus::Cancelled,
        ] {
            assert!(ensure_legal(status, ActionKind::Buzz).is_err());
            assert!(ensure_legal(status, ActionKind::Answer).is_err());
        }
    }

    #[test]
    fn chat_allowed_before_and_during_the_match() {
        assert!(ensure_legal(MatchStatus::Pending, ActionKind::Chat).is_ok());
        assert!(ensure_legal(MatchStatus::Active, ActionKind::Chat).is_ok());
        assert!(ensure_legal(MatchStatus::Completed, ActionKind::Chat).is_err());
        assert!(ensure_legal(MatchStatus::Cancelled, ActionKind::Chat).is_err());
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for status in [MatchStatus::Completed, MatchStatus::Cancelled] {
            assert!(status.is_terminal());
            for action in [
                ActionKind::Accept,
                ActionKind::Decline,
                ActionKind::Chat,
                ActionKind::Buzz,
                ActionKind::Answer,
            ] {
                let err = ensure_legal(status, action).unwrap_err();
                assert_eq!(err.status, status);
            }
        }
    }
}
