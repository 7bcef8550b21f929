//! Identity extractor for mutating routes.
//!
//! Authentication itself lives in front of this service; by the time a
//! request reaches a handler, the auth layer has resolved the caller and
//! stashed a [`CurrentUser`] in the request extensions. The [`Actor`]
//! extractor reads it back out and rejects with 401 when it is absent.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use greenbasket_core::UserId;

/// The resolved identity of the caller, as placed in request extensions by
/// the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The caller's user ID.
    pub id: UserId,
    /// Display name, recorded as the review author name.
    pub name: String,
}

/// Extractor that requires a resolved caller identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn post_review(
///     Actor(user): Actor,
/// ) -> impl IntoResponse {
///     format!("posting as {}", user.name)
/// }
/// ```
pub struct Actor(pub CurrentUser);

/// Rejection when no identity was resolved for the request.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Authentication required" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(Self)
            .ok_or(AuthRejection)
    }
}
