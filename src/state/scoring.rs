//! Scoring engine: grades answers and advances the match. Pure over the record.

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::state::{
    match_machine::MatchStatus,
    match_record::{AnswerEntry, MatchRecord},
};

/// Points awarded for a correct answer.
pub const POINTS_CORRECT: i32 = 100;
/// Points awarded (deducted) for an incorrect answer.
pub const POINTS_INCORRECT: i32 = -50;

/// Reasons a submitted answer cannot be graded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// Nobody holds the buzz; the submission is left over from a grant that
    /// timed out or was never made.
    #[error("no buzz is currently held for this question")]
    NoBuzzHeld,
    /// The buzz is held by the other participant.
    #[error("the buzz is held by participant `{holder}`")]
    NotBuzzHolder {
        /// Identity of the participant holding the buzz.
        holder: Uuid,
    },
    /// The submission targets a question index that already advanced.
    #[error("stale submission: question {submitted} is no longer current (now at {current})")]
    StaleQuestion {
        /// Index the submission targeted.
        submitted: usize,
        /// Index the match is actually at.
        current: usize,
    },
    /// An answer for this `(participant, question)` pair was already graded.
    #[error("question {question_index} was already answered by this participant")]
    AlreadyAnswered {
        /// The duplicated question index.
        question_index: usize,
    },
    /// The chosen option does not exist on the question.
    #[error("option {chosen} is out of range (question has {available} options)")]
    OptionOutOfRange {
        /// Option submitted by the participant.
        chosen: usize,
        /// Number of options on the question.
        available: usize,
    },
}

/// Outcome of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAnswer {
    /// Participant whose answer was graded.
    pub participant: Uuid,
    /// Question the answer applied to.
    pub question_index: usize,
    /// Option the participant chose.
    pub chosen_option: usize,
    /// Index of the correct option, revealed to both participants.
    pub correct_option: usize,
    /// Whether the answer was correct.
    pub correct: bool,
    /// Points applied to the answering participant.
    pub points_delta: i32,
    /// Whether grading this answer completed the match.
    pub completed: bool,
    /// Winner at completion; `None` for a draw or an unfinished match.
    pub winner: Option<Uuid>,
}

/// Outcome of advancing a question nobody answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionAdvanced {
    /// Index of the question that was abandoned.
    pub question_index: usize,
    /// Whether the advancement completed the match.
    pub completed: bool,
    /// Winner at completion; `None` for a draw or an unfinished match.
    pub winner: Option<Uuid>,
}

/// Grade `participant`'s answer for `question_index` and advance the match.
///
/// Preconditions (checked here, never assumed): the participant holds the
/// contested buzz, the index is still current, the pair was not graded
/// before, and the chosen option exists. On success the answer is logged,
/// the buzz cleared, and the question index advanced; reaching the last
/// question completes the match and freezes the winner.
pub fn grade_answer(
    record: &mut MatchRecord,
    participant: Uuid,
    question_index: usize,
    chosen_option: usize,
) -> Result<ScoredAnswer, ScoreError> {
    if question_index != record.current_question_index {
        return Err(ScoreError::StaleQuestion {
            submitted: question_index,
            current: record.current_question_index,
        });
    }

    let holder = record.contested_buzz.ok_or(ScoreError::NoBuzzHeld)?;
    if holder.participant != participant {
        return Err(ScoreError::NotBuzzHolder {
            holder: holder.participant,
        });
    }

    if record
        .answer_log
        .iter()
        .any(|entry| entry.participant == participant && entry.question_index == question_index)
    {
        return Err(ScoreError::AlreadyAnswered { question_index });
    }

    let question = record
        .current_question()
        .ok_or(ScoreError::StaleQuestion {
            submitted: question_index,
            current: record.current_question_index,
        })?;

    let available = question.options.len();
    if chosen_option >= available {
        return Err(ScoreError::OptionOutOfRange {
            chosen: chosen_option,
            available,
        });
    }

    let correct_option = question.correct_option;
    let correct = chosen_option == correct_option;
    let points_delta = if correct {
        POINTS_CORRECT
    } else {
        POINTS_INCORRECT
    };

    record.add_points(participant, points_delta);
    record.answer_log.push(AnswerEntry {
        participant,
        question_index,
        chosen_option,
        correct,
        points_delta,
    });

    let (completed, winner) = advance_question(record);

    Ok(ScoredAnswer {
        participant,
        question_index,
        chosen_option,
        correct_option,
        correct,
        points_delta,
        completed,
        winner,
    })
}

/// Advance past a question both participants forfeited. No answers are
/// logged and no points move; the question is simply recorded as unanswered.
pub fn advance_unanswered(record: &mut MatchRecord) -> QuestionAdvanced {
    let question_index = record.current_question_index;
    let (completed, winner) = advance_question(record);
    QuestionAdvanced {
        question_index,
        completed,
        winner,
    }
}

/// Clear the buzz, move to the next question, and complete the match when
/// the index reaches the end of the question set.
fn advance_question(record: &mut MatchRecord) -> (bool, Option<Uuid>) {
    record.contested_buzz = None;
    record.forfeits = 0;
    record.current_question_index += 1;

    if record.current_question_index == record.total_questions() {
        record.status = MatchStatus::Completed;
        record.completed_at = Some(SystemTime::now());
        record.winner = record.winner_by_score();
        (true, record.winner)
    } else {
        (false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_record::{ContestedBuzz, Question};

    fn two_question_match() -> MatchRecord {
        let mut record = MatchRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![
                Question {
                    prompt: "capital of France?".into(),
                    options: vec!["Paris".into(), "Lyon".into(), "Nice".into()],
                    correct_option: 0,
                },
                Question {
                    prompt: "7 * 8?".into(),
                    options: vec!["54".into(), "56".into()],
                    correct_option: 1,
                },
            ],
        );
        record.status = MatchStatus::Active;
        record
    }

    fn grant_buzz(record: &mut MatchRecord, participant: Uuid) {
        record.contested_buzz = Some(ContestedBuzz {
            participant,
            buzzed_at: SystemTime::now(),
        });
    }

    #[test]
    fn full_match_correct_then_incorrect_gives_winner_a() {
        let mut record = two_question_match();
        let (a, b) = (record.participant_a, record.participant_b);

        grant_buzz(&mut record, a);
        let first = grade_answer(&mut record, a, 0, 0).unwrap();
        assert!(first.correct);
        assert_eq!(first.points_delta, POINTS_CORRECT);
        assert!(!first.completed);
        assert_eq!(record.score_a, 100);
        assert_eq!(record.current_question_index, 1);
        assert!(record.contested_buzz.is_none());

        grant_buzz(&mut record, b);
        let second = grade_answer(&mut record, b, 1, 0).unwrap();
        assert!(!second.correct);
        assert_eq!(second.points_delta, POINTS_INCORRECT);
        assert!(second.completed);
        assert_eq!(second.winner, Some(a));
        assert_eq!(record.score_b, -50);
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!(record.winner, Some(a));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn answer_without_buzz_is_rejected() {
        let mut record = two_question_match();
        let a = record.participant_a;
        assert_eq!(grade_answer(&mut record, a, 0, 0), Err(ScoreError::NoBuzzHeld));
    }

    #[test]
    fn answer_from_the_other_participant_is_rejected() {
        let mut record = two_question_match();
        let (a, b) = (record.participant_a, record.participant_b);
        grant_buzz(&mut record, a);
        assert_eq!(
            grade_answer(&mut record, b, 0, 0),
            Err(ScoreError::NotBuzzHolder { holder: a })
        );
        // The rejection must not have touched anything.
        assert_eq!(record.score_b, 0);
        assert_eq!(record.current_question_index, 0);
        assert!(record.answer_log.is_empty());
    }

    #[test]
    fn stale_index_is_rejected_not_reapplied() {
        let mut record = two_question_match();
        let a = record.participant_a;
        grant_buzz(&mut record, a);
        grade_answer(&mut record, a, 0, 0).unwrap();

        // Replay of the already-applied submission targets index 0, which
        // has since advanced.
        grant_buzz(&mut record, a);
        assert_eq!(
            grade_answer(&mut record, a, 0, 0),
            Err(ScoreError::StaleQuestion {
                submitted: 0,
                current: 1
            })
        );
        assert_eq!(record.score_a, 100);
        assert_eq!(record.answer_log.len(), 1);
    }

    #[test]
    fn option_out_of_range_is_rejected() {
        let mut record = two_question_match();
        let a = record.participant_a;
        grant_buzz(&mut record, a);
        assert_eq!(
            grade_answer(&mut record, a, 0, 3),
            Err(ScoreError::OptionOutOfRange {
                chosen: 3,
                available: 3
            })
        );
    }

    #[test]
    fn equal_scores_complete_as_draw() {
        let mut record = two_question_match();
        let (a, b) = (record.participant_a, record.participant_b);

        grant_buzz(&mut record, a);
        grade_answer(&mut record, a, 0, 1).unwrap();
        grant_buzz(&mut record, b);
        let last = grade_answer(&mut record, b, 1, 0).unwrap();

        assert!(last.completed);
        assert_eq!(last.winner, None);
        assert_eq!(record.score_a, record.score_b);
        assert_eq!(record.winner, None);
    }

    #[test]
    fn unanswered_advancement_moves_on_without_scoring() {
        let mut record = two_question_match();
        let advanced = advance_unanswered(&mut record);
        assert_eq!(advanced.question_index, 0);
        assert!(!advanced.completed);
        assert_eq!(record.current_question_index, 1);
        assert!(record.answer_log.is_empty());
        assert_eq!((record.score_a, record.score_b), (0, 0));

        let last = advance_unanswered(&mut record);
        assert!(last.completed);
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!(record.winner, None);
    }
}
