use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::match_machine::MatchStatus;

/// One question of a match's fixed question set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Prompt shown to both participants.
    pub prompt: String,
    /// Answer options, at least two.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option: usize,
}

/// Persisted form of the transient buzz grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContestedBuzzEntity {
    /// Participant holding the buzz.
    pub participant: Uuid,
    /// When the buzz was granted.
    pub buzzed_at: SystemTime,
}

/// One graded answer in the append-only answer log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntryEntity {
    /// Participant who answered.
    pub participant: Uuid,
    /// Question the answer applied to.
    pub question_index: usize,
    /// Option the participant chose.
    pub chosen_option: usize,
    /// Whether the chosen option was the correct one.
    pub correct: bool,
    /// Points awarded (or deducted) for this answer.
    pub points_delta: i32,
}

/// One chat message in the append-only chat log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatEntryEntity {
    /// Participant who posted the message.
    pub participant: Uuid,
    /// Message text, already truncated to the configured maximum.
    pub text: String,
    /// When the message was posted.
    pub sent_at: SystemTime,
}

/// Aggregate match entity persisted by the storage layer.
///
/// `version` is the optimistic-concurrency token: every update is applied
/// only if the stored version still matches the one the mutation was
/// computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Opaque join token; primary key.
    pub code: String,
    /// Challenger identity.
    pub participant_a: Uuid,
    /// Challenged identity.
    pub participant_b: Uuid,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Challenger score.
    pub score_a: i32,
    /// Challenged score.
    pub score_b: i32,
    /// Ordered question set, fixed at creation.
    pub questions: Vec<QuestionEntity>,
    /// Index of the question currently being played.
    pub current_question_index: usize,
    /// Who currently holds the right to answer, if anyone.
    pub contested_buzz: Option<ContestedBuzzEntity>,
    /// Buzz forfeits recorded for the current question.
    pub forfeits: u8,
    /// Append-only log of graded answers.
    pub answer_log: Vec<AnswerEntryEntity>,
    /// Append-only chat history.
    pub chat_log: Vec<ChatEntryEntity>,
    /// Winner identity, set once at completion.
    pub winner: Option<Uuid>,
    /// When the challenge was issued.
    pub created_at: SystemTime,
    /// When the challenge was accepted.
    pub started_at: Option<SystemTime>,
    /// When the last question was graded.
    pub completed_at: Option<SystemTime>,
    /// Last time the match entity was updated.
    pub updated_at: SystemTime,
    /// Optimistic-concurrency token.
    pub version: u64,
}
