//! Match session gateway: the only component that reads and writes match
//! records. Authorizes actors, routes actions through the pure logic, runs
//! the versioned conditional update, and publishes fan-out events.

use std::time::{Duration, SystemTime};

use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::match_store::UpdateOutcome,
    dto::matches::{ActionRequest, ActionResponse, CreateMatchRequest, MatchView},
    error::ServiceError,
    services::{
        buzz_arbiter,
        sse_events::{self, MatchEvent},
    },
    state::{
        SharedState,
        match_machine::{ActionKind, MatchStatus, ensure_legal},
        match_record::{ChatEntry, MatchRecord},
        scoring,
    },
};

/// Attempts of the optimistic read-mutate-update loop before giving up.
const MAX_UPDATE_RETRIES: u32 = 3;

/// What a mutation decided to do with the record.
pub(crate) enum Mutation<T> {
    /// Persist the mutated record, then publish the events.
    Write {
        /// Value returned to the caller once the update applied.
        value: T,
        /// Deltas to fan out after persistence, in order.
        events: Vec<MatchEvent>,
    },
    /// Leave the record untouched; nothing is persisted or published.
    Skip(T),
}

/// Issue a new challenge from `challenger` against the requested opponent.
pub async fn create_match(
    state: &SharedState,
    challenger: Uuid,
    request: CreateMatchRequest,
) -> Result<MatchView, ServiceError> {
    if request.challenged == challenger {
        return Err(ServiceError::InvalidInput(
            "a participant cannot challenge themselves".into(),
        ));
    }

    let questions = request.questions.into_iter().map(Into::into).collect();
    let record = MatchRecord::new(challenger, request.challenged, questions);

    let store = state.require_match_store().await?;
    store.insert_match(record.clone().into()).await?;

    info!(
        code = %record.code,
        challenger = %record.participant_a,
        challenged = %record.participant_b,
        questions = record.total_questions(),
        "challenge issued"
    );

    spawn_challenge_expiry(state.clone(), record.code.clone());

    Ok(MatchView::from(&record))
}

/// Authorized snapshot of the current match state.
pub async fn snapshot(
    state: &SharedState,
    code: &str,
    participant: Uuid,
) -> Result<MatchView, ServiceError> {
    let record = load_match(state, code).await?;
    ensure_participant(&record, participant)?;
    Ok(MatchView::from(&record))
}

/// Route one participant action to its handler.
pub async fn act(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    action: ActionRequest,
) -> Result<ActionResponse, ServiceError> {
    match action {
        ActionRequest::Accept => accept(state, code, participant).await,
        ActionRequest::Decline => decline(state, code, participant).await,
        ActionRequest::Chat { text } => chat(state, code, participant, text).await,
        ActionRequest::Buzz { question_index } => {
            buzz_arbiter::try_buzz(state, code, participant, question_index).await
        }
        ActionRequest::Answer {
            question_index,
            option,
        } => answer(state, code, participant, question_index, option).await,
    }
}

async fn accept(
    state: &SharedState,
    code: &str,
    participant: Uuid,
) -> Result<ActionResponse, ServiceError> {
    mutate_match(state, code, |record| {
        ensure_participant(record, participant)?;
        ensure_legal(record.status, ActionKind::Accept)?;
        ensure_challenged(record, participant, "accept")?;

        record.status = MatchStatus::Active;
        record.started_at = Some(SystemTime::now());

        Ok(Mutation::Write {
            value: ActionResponse::Accepted,
            events: vec![MatchEvent::StatusChanged {
                status: MatchStatus::Active,
                winner: None,
            }],
        })
    })
    .await
}

async fn decline(
    state: &SharedState,
    code: &str,
    participant: Uuid,
) -> Result<ActionResponse, ServiceError> {
    mutate_match(state, code, |record| {
        ensure_participant(record, participant)?;
        ensure_legal(record.status, ActionKind::Decline)?;
        ensure_challenged(record, participant, "decline")?;

        record.status = MatchStatus::Cancelled;

        Ok(Mutation::Write {
            value: ActionResponse::Declined,
            events: vec![MatchEvent::StatusChanged {
                status: MatchStatus::Cancelled,
                winner: None,
            }],
        })
    })
    .await
}

async fn chat(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    text: String,
) -> Result<ActionResponse, ServiceError> {
    let max_len = state.config().chat_max_len;

    mutate_match(state, code, move |record| {
        ensure_participant(record, participant)?;
        ensure_legal(record.status, ActionKind::Chat)?;

        let stored: String = text.chars().take(max_len).collect();
        if stored.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "chat message must not be blank".into(),
            ));
        }

        let sent_at = SystemTime::now();
        record.chat_log.push(ChatEntry {
            participant,
            text: stored.clone(),
            sent_at,
        });

        Ok(Mutation::Write {
            value: ActionResponse::ChatPosted {
                text: stored.clone(),
            },
            events: vec![MatchEvent::ChatMessage {
                participant,
                text: stored,
                sent_at,
            }],
        })
    })
    .await
}

async fn answer(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    question_index: usize,
    option: usize,
) -> Result<ActionResponse, ServiceError> {
    mutate_match(state, code, move |record| {
        ensure_participant(record, participant)?;
        ensure_legal(record.status, ActionKind::Answer)?;

        let scored = scoring::grade_answer(record, participant, question_index, option)?;

        let mut events = vec![
            MatchEvent::AnswerResult {
                participant,
                question_index: scored.question_index,
                correct: scored.correct,
                points_delta: scored.points_delta,
                correct_option: scored.correct_option,
            },
            MatchEvent::ScoreUpdate {
                score_a: record.score_a,
                score_b: record.score_b,
            },
            MatchEvent::QuestionAdvanced {
                question_index: record.current_question_index,
            },
        ];
        if scored.completed {
            events.push(MatchEvent::StatusChanged {
                status: MatchStatus::Completed,
                winner: scored.winner,
            });
        }

        Ok(Mutation::Write {
            value: ActionResponse::AnswerScored {
                correct: scored.correct,
                points_delta: scored.points_delta,
                correct_option: scored.correct_option,
                completed: scored.completed,
                winner: scored.winner,
            },
            events,
        })
    })
    .await
}

/// Optimistic read-mutate-update loop over one match record.
///
/// Reads the entity at version `v`, applies the pure mutation, and writes
/// back conditioned on the version still being `v`. Losing the race retries
/// from a fresh read up to [`MAX_UPDATE_RETRIES`] times. Events are
/// published only after the store applied the update, so a rejected or
/// retried mutation is never observable on the fan-out channel.
pub(crate) async fn mutate_match<T>(
    state: &SharedState,
    code: &str,
    mut apply: impl FnMut(&mut MatchRecord) -> Result<Mutation<T>, ServiceError>,
) -> Result<T, ServiceError> {
    let store = state.require_match_store().await?;

    for attempt in 0..MAX_UPDATE_RETRIES {
        let entity = store
            .find_match(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("match `{code}` not found")))?;
        let expected_version = entity.version;
        let mut record: MatchRecord = entity.into();

        let (value, events) = match apply(&mut record)? {
            Mutation::Write { value, events } => (value, events),
            Mutation::Skip(value) => return Ok(value),
        };

        record.version = expected_version + 1;
        record.touch();

        match store
            .update_match(code, expected_version, record.into())
            .await?
        {
            UpdateOutcome::Applied => {
                sse_events::publish(state, code, &events);
                return Ok(value);
            }
            UpdateOutcome::PredicateFailed => {
                debug!(code, attempt, "conditional update lost a race; retrying");
            }
        }
    }

    Err(ServiceError::Conflict(format!(
        "match `{code}` kept changing under concurrent updates"
    )))
}

/// Read one match record, without authorization.
pub(crate) async fn load_match(
    state: &SharedState,
    code: &str,
) -> Result<MatchRecord, ServiceError> {
    let store = state.require_match_store().await?;
    let entity = store
        .find_match(code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{code}` not found")))?;
    Ok(entity.into())
}

pub(crate) fn ensure_participant(
    record: &MatchRecord,
    participant: Uuid,
) -> Result<(), ServiceError> {
    if record.is_participant(participant) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "not a participant of this match".into(),
        ))
    }
}

fn ensure_challenged(
    record: &MatchRecord,
    participant: Uuid,
    action: &str,
) -> Result<(), ServiceError> {
    if participant == record.participant_b {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(format!(
            "only the challenged participant can {action}"
        )))
    }
}

/// Cancel the challenge if it is still pending once the TTL elapses.
fn spawn_challenge_expiry(state: SharedState, code: String) {
    let ttl = state.config().challenge_ttl;
    tokio::spawn(async move {
        sleep(ttl).await;
        if let Err(err) = expire_challenge(&state, &code).await {
            warn!(code, error = %err, "challenge expiry sweep failed");
        }
    });
}

/// Transition `pending -> cancelled` when the challenge was never accepted.
/// No-op when the match already left the pending status.
pub(crate) async fn expire_challenge(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    mutate_match(state, code, |record| {
        if record.status != MatchStatus::Pending {
            return Ok(Mutation::Skip(()));
        }

        record.status = MatchStatus::Cancelled;
        info!(code = %record.code, "challenge expired unaccepted");

        Ok(Mutation::Write {
            value: (),
            events: vec![MatchEvent::StatusChanged {
                status: MatchStatus::Cancelled,
                winner: None,
            }],
        })
    })
    .await
}

/// Forfeit a granted buzz once the answer deadline elapses.
pub(crate) fn spawn_buzz_timeout(
    state: SharedState,
    code: String,
    question_index: usize,
    holder: Uuid,
    buzzed_at: SystemTime,
) {
    let timeout = state.config().buzz_timeout;
    tokio::spawn(async move {
        sleep(timeout).await;
        if let Err(err) = forfeit_buzz(&state, &code, question_index, holder, buzzed_at).await {
            warn!(code, error = %err, "buzz timeout sweep failed");
        }
    });
}

/// Clear an unanswered buzz grant and record the forfeit. The grant is
/// identified by holder, question index, and grant timestamp, so a timer
/// firing for an old grant never clears a newer one. Reaching the forfeit
/// limit advances the question unanswered.
pub(crate) async fn forfeit_buzz(
    state: &SharedState,
    code: &str,
    question_index: usize,
    holder: Uuid,
    buzzed_at: SystemTime,
) -> Result<(), ServiceError> {
    let max_forfeits = state.config().max_forfeits;

    mutate_match(state, code, |record| {
        if record.status != MatchStatus::Active
            || record.current_question_index != question_index
        {
            return Ok(Mutation::Skip(()));
        }
        let Some(buzz) = record.contested_buzz else {
            return Ok(Mutation::Skip(()));
        };
        if buzz.participant != holder || buzz.buzzed_at != buzzed_at {
            return Ok(Mutation::Skip(()));
        }

        record.contested_buzz = None;
        record.forfeits += 1;
        let forfeits = record.forfeits;

        let mut events = vec![MatchEvent::BuzzCleared {
            question_index,
            forfeits,
        }];

        if forfeits >= max_forfeits {
            let advanced = scoring::advance_unanswered(record);
            events.push(MatchEvent::QuestionAdvanced {
                question_index: record.current_question_index,
            });
            if advanced.completed {
                events.push(MatchEvent::StatusChanged {
                    status: MatchStatus::Completed,
                    winner: advanced.winner,
                });
            }
        }

        Ok(Mutation::Write { value: (), events })
    })
    .await
}

/// Periodically reclaim matches whose in-process timers were lost, for
/// example across a restart or when another instance owns the timer.
pub fn spawn_stall_sweeper(state: SharedState) {
    let interval = state.config().sweep_interval;
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            if let Err(err) = sweep_stalled(&state).await {
                warn!(error = %err, "stalled-match sweep failed");
            }
        }
    });
}

/// Walk every non-terminal record and replay its overdue deadline: pending
/// challenges past the TTL are cancelled, granted buzzes past the answer
/// deadline are forfeited. Uses the same guards as the in-process timers,
/// so sweeping a record that a timer already handled is a no-op.
pub(crate) async fn sweep_stalled(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_match_store().await?;
    let now = SystemTime::now();
    let challenge_ttl = state.config().challenge_ttl;
    let buzz_timeout = state.config().buzz_timeout;

    for entity in store.list_open_matches().await? {
        let record: MatchRecord = entity.into();
        let code = record.code.clone();

        let outcome = match record.status {
            MatchStatus::Pending if overdue(now, record.created_at, challenge_ttl) => {
                expire_challenge(state, &code).await
            }
            MatchStatus::Active => match record.contested_buzz {
                Some(buzz) if overdue(now, buzz.buzzed_at, buzz_timeout) => {
                    forfeit_buzz(
                        state,
                        &code,
                        record.current_question_index,
                        buzz.participant,
                        buzz.buzzed_at,
                    )
                    .await
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        };

        if let Err(err) = outcome {
            warn!(code, error = %err, "failed to reclaim a stalled match");
        }
    }

    Ok(())
}

fn overdue(now: SystemTime, since: SystemTime, deadline: Duration) -> bool {
    now.duration_since(since)
        .is_ok_and(|elapsed| elapsed >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::memory::InMemoryMatchStore,
        dto::matches::QuestionInput,
        state::AppState,
    };
    use std::sync::Arc;

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_match_store(Arc::new(InMemoryMatchStore::new()))
            .await;
        state
    }

    fn questions(correct: &[usize]) -> Vec<QuestionInput> {
        correct
            .iter()
            .map(|&correct_option| QuestionInput {
                prompt: "prompt".into(),
                options: vec!["a".into(), "b".into()],
                correct_option,
            })
            .collect()
    }

    async fn created(state: &SharedState, correct: &[usize]) -> (String, Uuid, Uuid) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let view = create_match(
            state,
            a,
            CreateMatchRequest {
                challenged: b,
                questions: questions(correct),
            },
        )
        .await
        .unwrap();
        (view.code, a, b)
    }

    async fn active(state: &SharedState, correct: &[usize]) -> (String, Uuid, Uuid) {
        let (code, a, b) = created(state, correct).await;
        act(state, &code, b, ActionRequest::Accept).await.unwrap();
        (code, a, b)
    }

    #[tokio::test]
    async fn challenger_cannot_challenge_themselves() {
        let state = test_state().await;
        let a = Uuid::new_v4();
        let result = create_match(
            &state,
            a,
            CreateMatchRequest {
                challenged: a,
                questions: questions(&[0]),
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn only_the_challenged_participant_accepts() {
        let state = test_state().await;
        let (code, a, b) = created(&state, &[0]).await;

        let result = act(&state, &code, a, ActionRequest::Accept).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));

        let result = act(&state, &code, b, ActionRequest::Accept).await;
        assert!(matches!(result, Ok(ActionResponse::Accepted)));

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Active);
        assert!(record.started_at.is_some());
    }

    #[tokio::test]
    async fn declined_match_rejects_all_subsequent_actions() {
        let state = test_state().await;
        let (code, a, b) = created(&state, &[0]).await;

        act(&state, &code, b, ActionRequest::Decline).await.unwrap();
        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Cancelled);

        for action in [
            ActionRequest::Accept,
            ActionRequest::Buzz { question_index: 0 },
            ActionRequest::Answer {
                question_index: 0,
                option: 0,
            },
        ] {
            let result = act(&state, &code, b, action).await;
            assert!(matches!(result, Err(ServiceError::IllegalTransition(_))));
        }
        let result = act(&state, &code, a, ActionRequest::Buzz { question_index: 0 }).await;
        assert!(matches!(result, Err(ServiceError::IllegalTransition(_))));
    }

    #[tokio::test]
    async fn non_participants_never_mutate_state() {
        let state = test_state().await;
        let (code, _a, _b) = created(&state, &[0]).await;
        let outsider = Uuid::new_v4();

        for action in [
            ActionRequest::Accept,
            ActionRequest::Chat {
                text: "hello".into(),
            },
        ] {
            let result = act(&state, &code, outsider, action).await;
            assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
        }

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Pending);
        assert!(record.chat_log.is_empty());
        assert_eq!(record.version, 0);

        let result = snapshot(&state, &code, outsider).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn chat_is_truncated_to_the_configured_length() {
        let state = test_state().await;
        let (code, a, _b) = created(&state, &[0]).await;
        let max_len = state.config().chat_max_len;

        let long = "x".repeat(max_len + 50);
        let response = act(&state, &code, a, ActionRequest::Chat { text: long })
            .await
            .unwrap();
        match response {
            ActionResponse::ChatPosted { text } => assert_eq!(text.chars().count(), max_len),
            other => panic!("unexpected response: {other:?}"),
        }

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.chat_log.len(), 1);
        assert_eq!(record.chat_log[0].text.chars().count(), max_len);
    }

    #[tokio::test]
    async fn full_two_question_match_ends_with_winner_a() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[1, 1]).await;

        // Q1: A buzzes first and answers correctly.
        act(&state, &code, a, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        let first = act(
            &state,
            &code,
            a,
            ActionRequest::Answer {
                question_index: 0,
                option: 1,
            },
        )
        .await
        .unwrap();
        match first {
            ActionResponse::AnswerScored {
                correct,
                points_delta,
                completed,
                ..
            } => {
                assert!(correct);
                assert_eq!(points_delta, 100);
                assert!(!completed);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        // Q2: B buzzes first and answers incorrectly.
        act(&state, &code, b, ActionRequest::Buzz { question_index: 1 })
            .await
            .unwrap();
        let second = act(
            &state,
            &code,
            b,
            ActionRequest::Answer {
                question_index: 1,
                option: 0,
            },
        )
        .await
        .unwrap();
        match second {
            ActionResponse::AnswerScored {
                correct,
                points_delta,
                completed,
                winner,
                ..
            } => {
                assert!(!correct);
                assert_eq!(points_delta, -50);
                assert!(completed);
                assert_eq!(winner, Some(a));
            }
            other => panic!("unexpected response: {other:?}"),
        }

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!((record.score_a, record.score_b), (100, -50));
        assert_eq!(record.winner, Some(a));
    }

    #[tokio::test]
    async fn answer_from_the_non_holder_is_rejected() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[0]).await;

        act(&state, &code, a, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        let result = act(
            &state,
            &code,
            b,
            ActionRequest::Answer {
                question_index: 0,
                option: 0,
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn replayed_answer_for_an_advanced_question_is_rejected() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[0, 0]).await;

        act(&state, &code, a, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        act(
            &state,
            &code,
            a,
            ActionRequest::Answer {
                question_index: 0,
                option: 0,
            },
        )
        .await
        .unwrap();

        // The same submission again: the index has advanced, so it must be
        // rejected rather than reapplied.
        act(&state, &code, b, ActionRequest::Buzz { question_index: 1 })
            .await
            .unwrap();
        let result = act(
            &state,
            &code,
            a,
            ActionRequest::Answer {
                question_index: 0,
                option: 0,
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Stale(_))));

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.score_a, 100);
        assert_eq!(record.answer_log.len(), 1);
    }

    #[tokio::test]
    async fn expiry_cancels_only_pending_matches() {
        let state = test_state().await;

        let (code, _a, _b) = created(&state, &[0]).await;
        expire_challenge(&state, &code).await.unwrap();
        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Cancelled);

        let (code, _a, _b) = active(&state, &[0]).await;
        expire_challenge(&state, &code).await.unwrap();
        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Active);
    }

    #[tokio::test]
    async fn forfeited_buzz_frees_the_question_for_the_opponent() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[0]).await;

        act(&state, &code, a, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        let granted = load_match(&state, &code).await.unwrap();
        let buzz = granted.contested_buzz.unwrap();

        forfeit_buzz(&state, &code, 0, buzz.participant, buzz.buzzed_at)
            .await
            .unwrap();

        let record = load_match(&state, &code).await.unwrap();
        assert!(record.contested_buzz.is_none());
        assert_eq!(record.forfeits, 1);
        assert_eq!(record.current_question_index, 0);

        // The question is contestable again.
        let response = act(&state, &code, b, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        assert!(matches!(response, ActionResponse::BuzzGranted { .. }));
    }

    #[tokio::test]
    async fn forfeit_limit_advances_the_question_unanswered() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[0]).await;

        for participant in [a, b] {
            act(
                &state,
                &code,
                participant,
                ActionRequest::Buzz { question_index: 0 },
            )
            .await
            .unwrap();
            let buzz = load_match(&state, &code)
                .await
                .unwrap()
                .contested_buzz
                .unwrap();
            forfeit_buzz(&state, &code, 0, buzz.participant, buzz.buzzed_at)
                .await
                .unwrap();
        }

        let record = load_match(&state, &code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!(record.current_question_index, 1);
        assert!(record.answer_log.is_empty());
        assert_eq!((record.score_a, record.score_b), (0, 0));
        assert_eq!(record.winner, None);
    }

    #[tokio::test]
    async fn stale_forfeit_never_clears_a_newer_grant() {
        let state = test_state().await;
        let (code, a, b) = active(&state, &[0]).await;

        act(&state, &code, a, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();
        let first = load_match(&state, &code)
            .await
            .unwrap()
            .contested_buzz
            .unwrap();

        forfeit_buzz(&state, &code, 0, first.participant, first.buzzed_at)
            .await
            .unwrap();
        act(&state, &code, b, ActionRequest::Buzz { question_index: 0 })
            .await
            .unwrap();

        // Replay of the first grant's timeout: identified by (holder,
        // timestamp), so it must leave B's grant alone.
        forfeit_buzz(&state, &code, 0, first.participant, first.buzzed_at)
            .await
            .unwrap();

        let record = load_match(&state, &code).await.unwrap();
        let buzz = record.contested_buzz.unwrap();
        assert_eq!(buzz.participant, b);
        assert_eq!(record.forfeits, 1);
    }

    /// Rewrite a stored record in place, as if its timestamps were older.
    async fn backdate(state: &SharedState, code: &str, rewind: impl FnOnce(&mut MatchRecord)) {
        let store = state.require_match_store().await.unwrap();
        let mut record = load_match(state, code).await.unwrap();
        let expected = record.version;
        rewind(&mut record);
        record.version = expected + 1;
        let outcome = store
            .update_match(code, expected, record.into())
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Applied));
    }

    #[tokio::test]
    async fn sweep_expires_overdue_challenges() {
        let state = test_state().await;
        let ttl = state.config().challenge_ttl;

        let (overdue_code, _a, _b) = created(&state, &[0]).await;
        let (fresh_code, _a, _b) = created(&state, &[0]).await;
        backdate(&state, &overdue_code, |record| {
            record.created_at -= ttl + Duration::from_secs(1);
        })
        .await;

        sweep_stalled(&state).await.unwrap();

        let record = load_match(&state, &overdue_code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Cancelled);
        let record = load_match(&state, &fresh_code).await.unwrap();
        assert_eq!(record.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn sweep_forfeits_overdue_buzzes() {
        let state = test_state().await;
        let timeout = state.config().buzz_timeout;

        let (overdue_code, a, _b) = active(&state, &[0]).await;
        act(
            &state,
            &overdue_code,
            a,
            ActionRequest::Buzz { question_index: 0 },
        )
        .await
        .unwrap();
        backdate(&state, &overdue_code, |record| {
            if let Some(buzz) = record.contested_buzz.as_mut() {
                buzz.buzzed_at -= timeout + Duration::from_secs(1);
            }
        })
        .await;

        let (fresh_code, a, _b) = active(&state, &[0]).await;
        act(
            &state,
            &fresh_code,
            a,
            ActionRequest::Buzz { question_index: 0 },
        )
        .await
        .unwrap();

        sweep_stalled(&state).await.unwrap();

        let record = load_match(&state, &overdue_code).await.unwrap();
        assert!(record.contested_buzz.is_none());
        assert_eq!(record.forfeits, 1);
        assert_eq!(record.status, MatchStatus::Active);

        let record = load_match(&state, &fresh_code).await.unwrap();
        assert!(record.contested_buzz.is_some());
        assert_eq!(record.forfeits, 0);
    }
}
