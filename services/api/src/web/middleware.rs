//! services/api/src/web/middleware.rs
//!
//! Bearer-token authentication for protecting routes.
//!
//! Both middlewares resolve the caller into a [`CurrentUser`] and store it in the
//! request extensions. Handlers then ask for it explicitly, either as
//! `CurrentUser` (the route must sit behind [`require_auth`]) or as
//! [`MaybeUser`] (behind [`optional_auth`]).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use quickcart_core::domain::User;
use quickcart_core::ports::PortError;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::web::state::AppState;

/// The authenticated caller, loaded fresh from storage on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// The caller, if a valid token was presented.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(CurrentUser::id)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
/// The scheme is matched case-insensitively.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    // 1. The header must be present and readable
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Token is missing".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid token format".to_string()))?;

    // 2. ... and carry a bearer token
    let token = parse_bearer(value)
        .ok_or_else(|| ApiError::Unauthorized("Invalid token format".to_string()))?;

    // 3. Verify signature and expiry
    let identity = state.tokens.verify(token).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized("Token is invalid or expired".to_string())
    })?;

    // 4. The user must still exist
    match state.db.get_user_by_id(identity.user_id).await {
        Ok(user) => Ok(CurrentUser(user)),
        Err(PortError::NotFound(_)) => {
            warn!(user_id = identity.user_id, "valid token for a missing user");
            Err(ApiError::Unauthorized("User not found".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Rejects the request with 401 unless it carries a valid token for an existing user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Attaches the caller when a valid token is presented; otherwise the request
/// continues anonymously.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.headers().contains_key(header::AUTHORIZATION) {
        match resolve_user(&state, req.headers()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => debug!(error = %e, "continuing anonymously"),
        }
    }
    next.run(req).await
}

//=========================================================================================
// Extractors
//=========================================================================================

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Token is missing".to_string()))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_tokens() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("  Bearer   abc  "), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes_and_shapes() {
        assert_eq!(parse_bearer("abc.def.ghi"), None);
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer a b"), None);
        assert_eq!(parse_bearer(""), None);
    }
}
