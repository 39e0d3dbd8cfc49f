//! Authentication extractors for bearer tokens.
//!
//! Handlers take `RequireAuth` for user endpoints, `AdminAuth` for admin
//! endpoints, and `OptionalAuth` for endpoints that serve both users and
//! guests.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use threadline_core::{UserId, UserRole};

use crate::state::AppState;

/// Verified identity of the caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token with the admin role.
pub struct AdminAuth(pub CurrentUser);

/// Extractor that reads the bearer token when present. A missing header is
/// `None`; a present but invalid token is still rejected.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Error returned when authentication or authorization fails.
pub enum AuthRejection {
    /// Missing, malformed, or expired token.
    Unauthorized,
    /// Valid token, but the role is not allowed.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authorized"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Pull `Bearer <token>` out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn verify(parts: &Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
    let token = bearer_token(parts).ok_or(AuthRejection::Unauthorized)?;
    let claims = state
        .auth()
        .verify_token(token)
        .map_err(|_| AuthRejection::Unauthorized)?;

    Ok(CurrentUser {
        id: claims.sub,
        role: claims.role,
    })
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = verify(parts, state)?;
        if !user.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        verify(parts, state).map(|user| Self(Some(user)))
    }
}
