use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Health report returned by the `/healthcheck` route.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while no healthy storage backend is available.
    pub status: String,
    /// Backend currently serving match records (`memory`, `mongodb`);
    /// absent while none is installed.
    pub storage: Option<String>,
}

impl HealthResponse {
    /// The named backend is installed and answering health checks.
    pub fn ok(backend: &str) -> Self {
        Self {
            status: "ok".to_string(),
            storage: Some(backend.to_string()),
        }
    }

    /// Degraded mode; the backend is named when one is installed but
    /// unhealthy, absent when none is installed at all.
    pub fn degraded(backend: Option<&str>) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: backend.map(str::to_string),
        }
    }
}
