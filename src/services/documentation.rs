use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Versus match backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::post_action,
        crate::routes::events::match_events,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::CreateMatchRequest,
            crate::dto::matches::QuestionInput,
            crate::dto::matches::ActionRequest,
            crate::dto::matches::ActionResponse,
            crate::dto::matches::MatchView,
            crate::dto::matches::QuestionView,
            crate::dto::matches::BuzzView,
            crate::dto::matches::AnswerView,
            crate::dto::matches::ChatView,
            crate::dto::sse::SnapshotEvent,
            crate::dto::sse::BuzzedEvent,
            crate::dto::sse::BuzzClearedEvent,
            crate::dto::sse::AnswerResultEvent,
            crate::dto::sse::ScoreUpdateEvent,
            crate::dto::sse::StatusChangedEvent,
            crate::dto::sse::ChatMessageEvent,
            crate::dto::sse::QuestionAdvancedEvent,
            crate::dto::sse::PresenceEvent,
            crate::state::match_machine::MatchStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Match lifecycle and participant actions"),
        (name = "events", description = "Server-sent event streams for match subscribers"),
    )
)]
pub struct ApiDoc;
