use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;

use crate::{
    error::AppError, routes::identity::Identity, services::sse_service, state::SharedState,
};

/// Configure the real-time event routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/matches/{code}/events", get(match_events))
}

#[utoipa::path(
    get,
    path = "/matches/{code}/events",
    tag = "events",
    params(("code" = String, Path, description = "Match code")),
    responses(
        (status = 200, description = "Match event stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Requester is not a participant"),
        (status = 404, description = "Unknown match code")
    )
)]
/// Stream match deltas to a participant, starting with a full snapshot.
pub async fn match_events(
    State(state): State<SharedState>,
    Identity(participant): Identity,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe(&state, &code, participant).await?;
    Ok(sse_service::to_sse_stream(
        state,
        code,
        participant,
        subscription,
    ))
}
