use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::matches::{ActionRequest, ActionResponse, CreateMatchRequest, MatchView},
    error::AppError,
    routes::identity::Identity,
    services::match_service,
    state::SharedState,
};

/// Routes handling match lifecycle and participant actions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/matches/{code}", get(get_match))
        .route("/matches/{code}/actions", post(post_action))
}

/// Issue a new challenge against another participant.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 200, description = "Challenge issued", body = MatchView),
        (status = 400, description = "Invalid question set or self-challenge"),
        (status = 401, description = "Missing or malformed participant identity"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Identity(participant): Identity,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<Json<MatchView>, AppError> {
    let view = match_service::create_match(&state, participant, payload).await?;
    Ok(Json(view))
}

/// Fetch the requesting participant's view of a match.
#[utoipa::path(
    get,
    path = "/matches/{code}",
    tag = "matches",
    params(("code" = String, Path, description = "Match code")),
    responses(
        (status = 200, description = "Current match state", body = MatchView),
        (status = 401, description = "Requester is not a participant"),
        (status = 404, description = "Unknown match code")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Identity(participant): Identity,
    Path(code): Path<String>,
) -> Result<Json<MatchView>, AppError> {
    let view = match_service::snapshot(&state, &code, participant).await?;
    Ok(Json(view))
}

/// Submit one participant action (accept, decline, chat, buzz, answer).
#[utoipa::path(
    post,
    path = "/matches/{code}/actions",
    tag = "matches",
    params(("code" = String, Path, description = "Match code")),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action outcome", body = ActionResponse),
        (status = 401, description = "Actor not allowed to perform this action"),
        (status = 404, description = "Unknown match code"),
        (status = 409, description = "Action illegal for the current status or stale")
    )
)]
pub async fn post_action(
    State(state): State<SharedState>,
    Identity(participant): Identity,
    Path(code): Path<String>,
    Json(payload): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = match_service::act(&state, &code, participant, payload).await?;
    Ok(Json(response))
}
