// Caller identity. Credential verification is owned by the external auth
// collaborator; by the time a request reaches this service the gateway has
// resolved the session into an `x-user-id` header, which the handlers trust.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::core::UserId;
use crate::error::AppError;

pub const VIEWER_HEADER: &str = "x-user-id";

/// The authenticated caller. Extraction rejects with 401 before any handler
/// logic runs.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub UserId);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(VIEWER_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing caller identity".to_string()))?;

        let id: i64 = header
            .to_str()
            .ok()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| AppError::Unauthorized("Malformed caller identity".to_string()))?;

        let user_id = UserId::new(id);
        if !user_id.is_valid() {
            return Err(AppError::Unauthorized("Malformed caller identity".to_string()));
        }
        Ok(Viewer(user_id))
    }
}
