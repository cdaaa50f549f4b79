use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{format_system_time, validation},
    state::{
        match_machine::MatchStatus,
        match_record::{AnswerEntry, ChatEntry, MatchRecord, Question},
    },
};

/// Payload used to issue a new challenge.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    /// Identity of the challenged participant.
    pub challenged: Uuid,
    /// Fixed, ordered question set for the match.
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuestionInput>,
}

/// Incoming question definition for the match bootstrap.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionInput {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl Validate for QuestionInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validation::validate_prompt(&self.prompt) {
            errors.add("prompt", e);
        }
        if let Err(e) = validation::validate_options(&self.options, self.correct_option) {
            errors.add("options", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<QuestionInput> for Question {
    fn from(value: QuestionInput) -> Self {
        Self {
            prompt: value.prompt,
            options: value.options,
            correct_option: value.correct_option,
        }
    }
}

/// One action submitted by a participant against a match.
///
/// `buzz` and `answer` carry the question index the client observed, so a
/// submission that raced a question advance is rejected as stale instead
/// of being applied to the wrong question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Accept the pending challenge (challenged participant only).
    Accept,
    /// Decline the pending challenge (challenged participant only).
    Decline,
    /// Post a chat message.
    Chat {
        /// Message text; truncated server-side to the configured maximum.
        text: String,
    },
    /// Claim the right to answer the current question.
    Buzz {
        /// Question index the client believes is current.
        question_index: usize,
    },
    /// Answer the current question while holding the buzz.
    Answer {
        /// Question index the client believes is current.
        question_index: usize,
        /// Chosen option index.
        option: usize,
    },
}

/// Outcome of a successfully processed action.
///
/// A lost buzz race is reported here as `buzz_denied` rather than as an
/// error response: losing the race is a normal gameplay outcome.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionResponse {
    /// The challenge was accepted; the match is now active.
    Accepted,
    /// The challenge was declined; the match is cancelled.
    Declined,
    /// The chat message was appended.
    ChatPosted {
        /// The stored (possibly truncated) text.
        text: String,
    },
    /// The buzz was granted to the caller.
    BuzzGranted {
        /// The question the grant applies to.
        question_index: usize,
        /// Milliseconds until the grant is forfeited if unanswered.
        answer_deadline_ms: u64,
    },
    /// Somebody else already holds the buzz.
    BuzzDenied {
        /// Identity of the participant holding the buzz.
        holder: Uuid,
    },
    /// The answer was graded and the match advanced.
    AnswerScored {
        correct: bool,
        points_delta: i32,
        correct_option: usize,
        completed: bool,
        winner: Option<Uuid>,
    },
}

/// Authorized projection of one match returned to its participants.
///
/// Correct options are revealed only for questions that have already been
/// graded (or for every question once the match completed).
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchView {
    pub code: String,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub status: MatchStatus,
    pub score_a: i32,
    pub score_b: i32,
    pub total_questions: usize,
    pub current_question_index: usize,
    pub questions: Vec<QuestionView>,
    pub contested_buzz: Option<BuzzView>,
    pub answer_log: Vec<AnswerView>,
    pub chat_log: Vec<ChatView>,
    pub winner: Option<Uuid>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Projection of one question with the correct option hidden until graded.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    /// Present only once the question has been graded or the match completed.
    pub correct_option: Option<usize>,
}

/// Projection of the current buzz grant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BuzzView {
    pub participant: Uuid,
    pub buzzed_at: String,
}

/// Projection of one graded answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerView {
    pub participant: Uuid,
    pub question_index: usize,
    pub chosen_option: usize,
    pub correct: bool,
    pub points_delta: i32,
}

/// Projection of one chat message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatView {
    pub participant: Uuid,
    pub text: String,
    pub sent_at: String,
}

impl From<&AnswerEntry> for AnswerView {
    fn from(entry: &AnswerEntry) -> Self {
        Self {
            participant: entry.participant,
            question_index: entry.question_index,
            chosen_option: entry.chosen_option,
            correct: entry.correct,
            points_delta: entry.points_delta,
        }
    }
}

impl From<&ChatEntry> for ChatView {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            participant: entry.participant,
            text: entry.text.clone(),
            sent_at: format_system_time(entry.sent_at),
        }
    }
}

impl From<&MatchRecord> for MatchView {
    fn from(record: &MatchRecord) -> Self {
        let reveal_all = record.status == MatchStatus::Completed;
        let questions = record
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionView {
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                correct_option: (reveal_all || index < record.current_question_index)
                    .then_some(question.correct_option),
            })
            .collect();

        Self {
            code: record.code.clone(),
            participant_a: record.participant_a,
            participant_b: record.participant_b,
            status: record.status,
            score_a: record.score_a,
            score_b: record.score_b,
            total_questions: record.total_questions(),
            current_question_index: record.current_question_index,
            questions,
            contested_buzz: record.contested_buzz.map(|buzz| BuzzView {
                participant: buzz.participant,
                buzzed_at: format_system_time(buzz.buzzed_at),
            }),
            answer_log: record.answer_log.iter().map(Into::into).collect(),
            chat_log: record.chat_log.iter().map(Into::into).collect(),
            winner: record.winner,
            created_at: format_system_time(record.created_at),
            started_at: record.started_at.map(format_system_time),
            completed_at: record.completed_at.map(format_system_time),
        }
    }
}
