//! Caller identity extraction.
//!
//! The platform gateway in front of this service authenticates participants
//! and forwards the verified identifier in the `x-participant-id` header.
//! Every match endpoint requires it; requests without a parseable identifier
//! are rejected before any handler runs.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated participant identifier.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

/// Verified identity of the requesting participant.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Uuid);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(PARTICIPANT_HEADER)
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing `{PARTICIPANT_HEADER}` header"))
            })?
            .to_str()
            .map_err(|_| {
                AppError::Unauthorized(format!("malformed `{PARTICIPANT_HEADER}` header"))
            })?;

        let participant = Uuid::parse_str(value).map_err(|_| {
            AppError::Unauthorized(format!(
                "`{PARTICIPANT_HEADER}` header is not a valid participant id"
            ))
        })?;

        Ok(Identity(participant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Identity, AppError> {
        let mut builder = Request::builder().uri("/matches");
        if let Some(value) = header {
            builder = builder.header(PARTICIPANT_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Identity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_a_valid_participant_id() {
        let id = Uuid::new_v4();
        let identity = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(identity.0, id);
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_headers() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(
            extract(Some("not-a-uuid")).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
