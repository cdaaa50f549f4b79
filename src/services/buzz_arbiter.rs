//! First-buzz arbitration.
//!
//! Both participants may buzz at effectively the same instant; exactly one
//! of them must win. The arbiter never decides locally: it records the
//! claim through the same versioned conditional update every mutation uses,
//! so two concurrent claims race on the record version and the loser's
//! retry observes the winner's grant. Losing the race is a normal outcome,
//! not an error.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::matches::ActionResponse,
    error::ServiceError,
    services::{
        match_service::{self, Mutation},
        sse_events::MatchEvent,
    },
    state::{
        SharedState,
        match_machine::{ActionKind, ensure_legal},
        match_record::ContestedBuzz,
    },
};

/// Claim answering rights for the current question.
///
/// Returns `BuzzGranted` with the answer deadline when the claim won, or
/// `BuzzDenied` naming the holder when the opponent already holds the buzz.
pub async fn try_buzz(
    state: &SharedState,
    code: &str,
    participant: Uuid,
    question_index: usize,
) -> Result<ActionResponse, ServiceError> {
    let mut granted_at = None;

    let response = match_service::mutate_match(state, code, |record| {
        match_service::ensure_participant(record, participant)?;
        ensure_legal(record.status, ActionKind::Buzz)?;

        if question_index != record.current_question_index {
            return Err(ServiceError::Stale(format!(
                "buzz targets question {question_index} but question {} is current",
                record.current_question_index
            )));
        }

        if let Some(buzz) = record.contested_buzz {
            return Ok(Mutation::Skip(ActionResponse::BuzzDenied {
                holder: buzz.participant,
            }));
        }

        let buzzed_at = SystemTime::now();
        record.contested_buzz = Some(ContestedBuzz {
            participant,
            buzzed_at,
        });
        granted_at = Some(buzzed_at);

        Ok(Mutation::Write {
            value: ActionResponse::BuzzGranted {
                question_index,
                answer_deadline_ms: state.config().buzz_timeout.as_millis() as u64,
            },
            events: vec![MatchEvent::Buzzed {
                participant,
                question_index,
            }],
        })
    })
    .await?;

    if let ActionResponse::BuzzGranted { .. } = &response
        && let Some(buzzed_at) = granted_at
    {
        info!(code, participant = %participant, question_index, "buzz granted");
        match_service::spawn_buzz_timeout(
            state.clone(),
            code.to_string(),
            question_index,
            participant,
            buzzed_at,
        );
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::memory::InMemoryMatchStore,
        dto::matches::{ActionRequest, CreateMatchRequest, QuestionInput},
        state::AppState,
    };
    use std::sync::Arc;

    async fn active_match(state: &SharedState) -> (String, Uuid, Uuid) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let view = match_service::create_match(
            state,
            a,
            CreateMatchRequest {
                challenged: b,
                questions: vec![QuestionInput {
                    prompt: "prompt".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_option: 0,
                }],
            },
        )
        .await
        .unwrap();
        match_service::act(state, &view.code, b, ActionRequest::Accept)
            .await
            .unwrap();
        (view.code, a, b)
    }

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_match_store(Arc::new(InMemoryMatchStore::new()))
            .await;
        state
    }

    #[tokio::test]
    async fn second_buzz_is_denied_and_names_the_holder() {
        let state = test_state().await;
        let (code, a, b) = active_match(&state).await;

        let first = try_buzz(&state, &code, a, 0).await.unwrap();
        assert!(matches!(first, ActionResponse::BuzzGranted { .. }));

        let second = try_buzz(&state, &code, b, 0).await.unwrap();
        match second {
            ActionResponse::BuzzDenied { holder } => assert_eq!(holder, a),
            other => panic!("unexpected response: {other:?}"),
        }

        // The denial must not have bumped the version.
        let record = match_service::load_match(&state, &code).await.unwrap();
        let version_after_denial = record.version;
        let third = try_buzz(&state, &code, b, 0).await.unwrap();
        assert!(matches!(third, ActionResponse::BuzzDenied { .. }));
        let record = match_service::load_match(&state, &code).await.unwrap();
        assert_eq!(record.version, version_after_denial);
    }

    #[tokio::test]
    async fn buzz_for_a_non_current_question_is_stale() {
        let state = test_state().await;
        let (code, a, _b) = active_match(&state).await;

        let result = try_buzz(&state, &code, a, 7).await;
        assert!(matches!(result, Err(ServiceError::Stale(_))));
    }

    #[tokio::test]
    async fn concurrent_buzzes_grant_exactly_one_winner() {
        let state = test_state().await;
        let (code, a, b) = active_match(&state).await;

        let mut tasks = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            let code = code.clone();
            let participant = if i % 2 == 0 { a } else { b };
            tasks.push(tokio::spawn(async move {
                try_buzz(&state, &code, participant, 0).await
            }));
        }

        let mut granted = 0;
        let mut denied = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                ActionResponse::BuzzGranted { .. } => granted += 1,
                ActionResponse::BuzzDenied { .. } => denied += 1,
                other => panic!("unexpected response: {other:?}"),
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(denied, 15);

        let record = match_service::load_match(&state, &code).await.unwrap();
        let holder = record.contested_buzz.unwrap().participant;
        assert!(holder == a || holder == b);
    }
}
