//! Domain events raised by match mutations and their fan-out publication.

use std::time::SystemTime;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        format_system_time,
        matches::MatchView,
        sse::{
            AnswerResultEvent, BuzzClearedEvent, BuzzedEvent, ChatMessageEvent, PresenceEvent,
            QuestionAdvancedEvent, ScoreUpdateEvent, ServerEvent, SnapshotEvent,
            StatusChangedEvent,
        },
    },
    state::{SharedState, match_machine::MatchStatus},
};

const EVENT_SNAPSHOT: &str = "snapshot";
const EVENT_BUZZED: &str = "buzzed";
const EVENT_BUZZ_CLEARED: &str = "buzz.cleared";
const EVENT_ANSWER_RESULT: &str = "answer.result";
const EVENT_SCORE_UPDATE: &str = "score.update";
const EVENT_STATUS_CHANGED: &str = "status.changed";
const EVENT_CHAT_MESSAGE: &str = "chat.message";
const EVENT_QUESTION_ADVANCED: &str = "question.advanced";
const EVENT_PRESENCE: &str = "presence";

/// State delta produced by an applied match mutation.
///
/// Collected while the mutation runs and published only after the
/// conditional update was applied, in the order they were produced, so
/// subscribers always see buzz before answer before score for the same
/// question.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A participant won the buzz race.
    Buzzed {
        participant: Uuid,
        question_index: usize,
    },
    /// A granted buzz was forfeited.
    BuzzCleared { question_index: usize, forfeits: u8 },
    /// An answer was graded.
    AnswerResult {
        participant: Uuid,
        question_index: usize,
        correct: bool,
        points_delta: i32,
        correct_option: usize,
    },
    /// A score changed.
    ScoreUpdate { score_a: i32, score_b: i32 },
    /// The lifecycle status changed.
    StatusChanged {
        status: MatchStatus,
        winner: Option<Uuid>,
    },
    /// A chat message was appended.
    ChatMessage {
        participant: Uuid,
        text: String,
        sent_at: SystemTime,
    },
    /// The match moved on to the next question.
    QuestionAdvanced { question_index: usize },
}

/// Publish a batch of events onto the match's fan-out channel.
///
/// Delivery is best-effort and never affects the already-persisted state;
/// when a terminal status change goes out, the channel is dropped from the
/// registry afterwards.
pub fn publish(state: &SharedState, code: &str, events: &[MatchEvent]) {
    let mut terminal = false;

    for event in events {
        match event {
            MatchEvent::Buzzed {
                participant,
                question_index,
            } => send_match_event(
                state,
                code,
                EVENT_BUZZED,
                &BuzzedEvent {
                    participant: *participant,
                    question_index: *question_index,
                },
            ),
            MatchEvent::BuzzCleared {
                question_index,
                forfeits,
            } => send_match_event(
                state,
                code,
                EVENT_BUZZ_CLEARED,
                &BuzzClearedEvent {
                    question_index: *question_index,
                    forfeits: *forfeits,
                },
            ),
            MatchEvent::AnswerResult {
                participant,
                question_index,
                correct,
                points_delta,
                correct_option,
            } => send_match_event(
                state,
                code,
                EVENT_ANSWER_RESULT,
                &AnswerResultEvent {
                    participant: *participant,
                    question_index: *question_index,
                    correct: *correct,
                    points_delta: *points_delta,
                    correct_option: *correct_option,
                },
            ),
            MatchEvent::ScoreUpdate { score_a, score_b } => send_match_event(
                state,
                code,
                EVENT_SCORE_UPDATE,
                &ScoreUpdateEvent {
                    score_a: *score_a,
                    score_b: *score_b,
                },
            ),
            MatchEvent::StatusChanged { status, winner } => {
                terminal = terminal || status.is_terminal();
                send_match_event(
                    state,
                    code,
                    EVENT_STATUS_CHANGED,
                    &StatusChangedEvent {
                        status: *status,
                        winner: *winner,
                    },
                );
            }
            MatchEvent::ChatMessage {
                participant,
                text,
                sent_at,
            } => send_match_event(
                state,
                code,
                EVENT_CHAT_MESSAGE,
                &ChatMessageEvent {
                    participant: *participant,
                    text: text.clone(),
                    sent_at: format_system_time(*sent_at),
                },
            ),
            MatchEvent::QuestionAdvanced { question_index } => send_match_event(
                state,
                code,
                EVENT_QUESTION_ADVANCED,
                &QuestionAdvancedEvent {
                    question_index: *question_index,
                },
            ),
        }
    }

    if terminal {
        state.fanout().remove(code);
    }
}

/// Broadcast the connected-participant roster for a match.
pub fn broadcast_presence(state: &SharedState, code: &str, connected: Vec<Uuid>) {
    send_match_event(state, code, EVENT_PRESENCE, &PresenceEvent { connected });
}

/// Build the snapshot event a fresh subscriber receives first.
pub fn snapshot_event(view: MatchView) -> Option<ServerEvent> {
    match ServerEvent::json(Some(EVENT_SNAPSHOT.to_string()), &SnapshotEvent(view)) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize snapshot event");
            None
        }
    }
}

fn send_match_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.fanout().channel(code).broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize fan-out payload"),
    }
}
