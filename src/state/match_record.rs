//! Runtime representation of one match, the single shared mutable resource.

use std::time::SystemTime;

use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntryEntity, ChatEntryEntity, ContestedBuzzEntity, MatchEntity, QuestionEntity},
    state::match_machine::MatchStatus,
};

/// Length of the opaque join code handed to both participants.
const CODE_LENGTH: usize = 10;

/// One question of the fixed set played during a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Prompt shown to both participants.
    pub prompt: String,
    /// Answer options, at least two.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option: usize,
}

/// Transient record of who currently holds the right to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContestedBuzz {
    /// Participant holding the buzz.
    pub participant: Uuid,
    /// When the buzz was granted; part of the identity of the grant so a
    /// timeout for an old grant never clears a newer one.
    pub buzzed_at: SystemTime,
}

/// One graded answer, appended once per `(participant, question)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
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

/// One chat message exchanged between the participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    /// Participant who posted the message.
    pub participant: Uuid,
    /// Message text, truncated to the configured maximum length.
    pub text: String,
    /// When the message was posted.
    pub sent_at: SystemTime,
}

/// Aggregate state for one head-to-head match.
///
/// Owned exclusively by the match service; every mutation goes through the
/// store's versioned conditional update, never through independent
/// read-then-write steps.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    /// Opaque, unguessable join token. Immutable and unique.
    pub code: String,
    /// Challenger identity.
    pub participant_a: Uuid,
    /// Challenged identity.
    pub participant_b: Uuid,
    /// Lifecycle status governing which actions are legal.
    pub status: MatchStatus,
    /// Challenger score; may go negative.
    pub score_a: i32,
    /// Challenged score; may go negative.
    pub score_b: i32,
    /// Ordered question set, fixed at creation.
    pub questions: Vec<Question>,
    /// Index of the question currently being played, in `[0, questions.len()]`.
    pub current_question_index: usize,
    /// Who currently holds the right to answer, if anyone.
    pub contested_buzz: Option<ContestedBuzz>,
    /// Buzz forfeits recorded for the current question; reset on advance.
    pub forfeits: u8,
    /// Append-only log of graded answers.
    pub answer_log: Vec<AnswerEntry>,
    /// Append-only chat history.
    pub chat_log: Vec<ChatEntry>,
    /// Winner identity, set once at completion; `None` means draw (or not
    /// completed yet).
    pub winner: Option<Uuid>,
    /// When the challenge was issued.
    pub created_at: SystemTime,
    /// When the challenge was accepted.
    pub started_at: Option<SystemTime>,
    /// When the last question was graded.
    pub completed_at: Option<SystemTime>,
    /// Refreshed on every applied mutation.
    pub updated_at: SystemTime,
    /// Optimistic-concurrency token checked by the store on every update.
    pub version: u64,
}

impl MatchRecord {
    /// Build a fresh pending match between `challenger` and `challenged`.
    pub fn new(challenger: Uuid, challenged: Uuid, questions: Vec<Question>) -> Self {
        let now = SystemTime::now();
        Self {
            code: generate_code(),
            participant_a: challenger,
            participant_b: challenged,
            status: MatchStatus::Pending,
            score_a: 0,
            score_b: 0,
            questions,
            current_question_index: 0,
            contested_buzz: None,
            forfeits: 0,
            answer_log: Vec::new(),
            chat_log: Vec::new(),
            winner: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            version: 0,
        }
    }

    /// Number of questions played before the match completes.
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Whether `id` is one of the two competitors.
    pub fn is_participant(&self, id: Uuid) -> bool {
        id == self.participant_a || id == self.participant_b
    }

    /// The other competitor, when `id` is a participant.
    pub fn opponent_of(&self, id: Uuid) -> Option<Uuid> {
        if id == self.participant_a {
            Some(self.participant_b)
        } else if id == self.participant_b {
            Some(self.participant_a)
        } else {
            None
        }
    }

    /// Current score of `id`, when `id` is a participant.
    pub fn score_of(&self, id: Uuid) -> Option<i32> {
        if id == self.participant_a {
            Some(self.score_a)
        } else if id == self.participant_b {
            Some(self.score_b)
        } else {
            None
        }
    }

    /// Apply a point delta to a participant's score.
    pub fn add_points(&mut self, id: Uuid, delta: i32) {
        if id == self.participant_a {
            self.score_a += delta;
        } else if id == self.participant_b {
            self.score_b += delta;
        }
    }

    /// Winner by strictly higher score; `None` on equal scores (draw).
    pub fn winner_by_score(&self) -> Option<Uuid> {
        match self.score_a.cmp(&self.score_b) {
            std::cmp::Ordering::Greater => Some(self.participant_a),
            std::cmp::Ordering::Less => Some(self.participant_b),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The question currently being played, if the match is not past the end.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Refresh the audit timestamp before persisting a mutation.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

/// Generate an opaque alphanumeric join code.
fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            prompt: value.prompt,
            options: value.options,
            correct_option: value.correct_option,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            prompt: value.prompt,
            options: value.options,
            correct_option: value.correct_option,
        }
    }
}

impl From<ContestedBuzzEntity> for ContestedBuzz {
    fn from(value: ContestedBuzzEntity) -> Self {
        Self {
            participant: value.participant,
            buzzed_at: value.buzzed_at,
        }
    }
}

impl From<ContestedBuzz> for ContestedBuzzEntity {
    fn from(value: ContestedBuzz) -> Self {
        Self {
            participant: value.participant,
            buzzed_at: value.buzzed_at,
        }
    }
}

impl From<AnswerEntryEntity> for AnswerEntry {
    fn from(value: AnswerEntryEntity) -> Self {
        Self {
            participant: value.participant,
            question_index: value.question_index,
            chosen_option: value.chosen_option,
            correct: value.correct,
            points_delta: value.points_delta,
        }
    }
}

impl From<AnswerEntry> for AnswerEntryEntity {
    fn from(value: AnswerEntry) -> Self {
        Self {
            participant: value.participant,
            question_index: value.question_index,
            chosen_option: value.chosen_option,
            correct: value.correct,
            points_delta: value.points_delta,
        }
    }
}

impl From<ChatEntryEntity> for ChatEntry {
    fn from(value: ChatEntryEntity) -> Self {
        Self {
            participant: value.participant,
            text: value.text,
            sent_at: value.sent_at,
        }
    }
}

impl From<ChatEntry> for ChatEntryEntity {
    fn from(value: ChatEntry) -> Self {
        Self {
            participant: value.participant,
            text: value.text,
            sent_at: value.sent_at,
        }
    }
}

impl From<MatchEntity> for MatchRecord {
    fn from(value: MatchEntity) -> Self {
        Self {
            code: value.code,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            status: value.status,
            score_a: value.score_a,
            score_b: value.score_b,
            questions: value.questions.into_iter().map(Into::into).collect(),
            current_question_index: value.current_question_index,
            contested_buzz: value.contested_buzz.map(Into::into),
            forfeits: value.forfeits,
            answer_log: value.answer_log.into_iter().map(Into::into).collect(),
            chat_log: value.chat_log.into_iter().map(Into::into).collect(),
            winner: value.winner,
            created_at: value.created_at,
            started_at: value.started_at,
            completed_at: value.completed_at,
            updated_at: value.updated_at,
            version: value.version,
        }
    }
}

impl From<MatchRecord> for MatchEntity {
    fn from(value: MatchRecord) -> Self {
        Self {
            code: value.code,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            status: value.status,
            score_a: value.score_a,
            score_b: value.score_b,
            questions: value.questions.into_iter().map(Into::into).collect(),
            current_question_index: value.current_question_index,
            contested_buzz: value.contested_buzz.map(Into::into),
            forfeits: value.forfeits,
            answer_log: value.answer_log.into_iter().map(Into::into).collect(),
            chat_log: value.chat_log.into_iter().map(Into::into).collect(),
            winner: value.winner,
            created_at: value.created_at,
            started_at: value.started_at,
            completed_at: value.completed_at,
            updated_at: value.updated_at,
            version: value.version,
        }
    }
}
