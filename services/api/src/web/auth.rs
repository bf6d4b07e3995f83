//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and session introspection.
//!
//! Tokens are stateless, so logout only acknowledges the request and the client
//! discards its token.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use once_cell::sync::Lazy;
use quickcart_core::domain::{normalize_email, NewUser, User};
use quickcart_core::ports::PortError;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{
    AuthResponse, CurrentUserResponse, LoginRequest, LogoutResponse, RegisterRequest,
    UserResponse,
};
use crate::web::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Returns the trimmed value, or a 400 naming the field when it is absent or blank.
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> ApiResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

fn issue_auth_response(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let issued = state.tokens.issue(user.id, &user.email)?;
    Ok(AuthResponse {
        success: true,
        token: issued.token,
        user: UserResponse::from(user),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing field, malformed email or short password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    // 1. Validate the submitted fields
    let email = required(&req.email, "email")?;
    let password = req.password.as_deref().unwrap_or_default();
    if password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }
    let first_name = required(&req.first_name, "first_name")?;
    let last_name = required(&req.last_name, "last_name")?;

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    // 2. Hash the password and create the user
    let password_hash = state.passwords.hash(password)?;
    let user = state
        .db
        .create_user(NewUser {
            email,
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
        .await?;
    info!(user_id = user.id, "registered new user");

    // 3. Sign them in straight away
    let response = issue_auth_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    let (Some(email), Some(password)) = (
        req.email.as_deref().filter(|e| !e.trim().is_empty()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    // 1. Get user by email
    let creds = match state.db.get_user_by_email(&normalize_email(email)).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !state.passwords.verify(password, &creds.password_hash) {
        warn!(user_id = creds.user.id, "login failed: wrong password");
        return Err(invalid());
    }

    Ok(Json(issue_auth_response(&state, creds.user)?))
}

/// GET /api/auth/me - The authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The current user", body = CurrentUserResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(current: CurrentUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user: UserResponse::from(current.0),
    })
}

/// POST /api/auth/logout - Acknowledge a logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn logout_handler(current: CurrentUser) -> Json<LogoutResponse> {
    info!(user_id = current.id(), "user logged out");
    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_accepts_ordinary_addresses() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
    }

    #[test]
    fn email_pattern_rejects_malformed_addresses() {
        assert!(!is_valid_email("invalid-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn required_trims_and_names_the_field() {
        assert_eq!(required(&Some("  Ann ".to_string()), "first_name").ok(), Some("Ann"));
        let err = required(&Some("   ".to_string()), "first_name").unwrap_err();
        assert_eq!(err.to_string(), "first_name is required");
        assert!(required(&None, "email").is_err());
    }
}
