use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Build the health report: which backend serves match records and whether
/// it currently answers a health check.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.match_store().await else {
        warn!("no storage backend installed (degraded mode)");
        return HealthResponse::degraded(None);
    };

    let backend = store.backend_name();
    if let Err(err) = store.health_check().await {
        warn!(backend, error = %err, "storage health check failed");
        return HealthResponse::degraded(Some(backend));
    }

    if state.is_degraded().await {
        HealthResponse::degraded(Some(backend))
    } else {
        HealthResponse::ok(backend)
    }
}
