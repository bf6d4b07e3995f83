//! services/api/src/web/profile.rs
//!
//! The authenticated user's own profile and order history.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use quickcart_core::domain::{normalize_email, UserUpdate};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::web::auth::is_valid_email;
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{
    OrderResponse, ProfileResponse, ProfileUpdateRequest, ProfileUpdateResponse, UserResponse,
};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "The user and their orders, newest first", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> ApiResult<Json<ProfileResponse>> {
    let orders = state.db.list_orders_for_user(current.id()).await?;
    Ok(Json(ProfileResponse {
        user: UserResponse::from(current.0),
        orders: orders.into_iter().map(OrderResponse::from).collect(),
    }))
}

/// Turns the request into an update. Names are trimmed; a new email is normalized
/// and must be well formed.
fn to_update(req: ProfileUpdateRequest) -> ApiResult<UserUpdate> {
    let email = match req.email {
        Some(raw) => {
            let email = normalize_email(&raw);
            if !is_valid_email(&email) {
                return Err(ApiError::Validation("Invalid email format".to_string()));
            }
            Some(email)
        }
        None => None,
    };
    Ok(UserUpdate {
        email,
        first_name: req.first_name.map(|n| n.trim().to_string()),
        last_name: req.last_name.map(|n| n.trim().to_string()),
    })
}

#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdateResponse),
        (status = 400, description = "Malformed email"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 409, description = "Email belongs to another user")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileUpdateResponse>> {
    let Json(req) = payload?;
    let update = to_update(req)?;
    let user = state.db.update_user(current.id(), update).await?;
    info!(user_id = user.id, "profile updated");
    Ok(Json(ProfileUpdateResponse {
        success: true,
        user: UserResponse::from(user),
    }))
}
