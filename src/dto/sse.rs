use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::matches::MatchView, state::match_machine::MatchStatus};

#[derive(Clone, Debug)]
/// Dispatched payload carried across a match fan-out channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Full current-state snapshot sent to every subscriber on connect.
/// Late joiners resync from this instead of replayed history.
pub struct SnapshotEvent(pub MatchView);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a participant wins the buzz race for a question.
pub struct BuzzedEvent {
    pub participant: Uuid,
    pub question_index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a granted buzz was forfeited and the question is
/// contestable again.
pub struct BuzzClearedEvent {
    pub question_index: usize,
    /// Forfeits recorded so far for this question.
    pub forfeits: u8,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once an answer has been graded.
pub struct AnswerResultEvent {
    pub participant: Uuid,
    pub question_index: usize,
    pub correct: bool,
    pub points_delta: i32,
    pub correct_option: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever either score changes.
pub struct ScoreUpdateEvent {
    pub score_a: i32,
    pub score_b: i32,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on every lifecycle status change.
pub struct StatusChangedEvent {
    pub status: MatchStatus,
    pub winner: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a chat message is appended.
pub struct ChatMessageEvent {
    pub participant: Uuid,
    pub text: String,
    pub sent_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the match moved on to the next question.
pub struct QuestionAdvancedEvent {
    /// Index of the question that is now current; equals the total question
    /// count when the match just completed.
    pub question_index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the set of connected participants changes.
pub struct PresenceEvent {
    pub connected: Vec<Uuid>,
}
