//! services/api/src/web/orders.rs
//!
//! Cart validation, checkout, and order lookup endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use quickcart_core::domain::CartLine;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::web::middleware::MaybeUser;
use crate::web::protocol::{
    CartLineReport, CartValidationRequest, CartValidationResponse, CheckoutPayload,
    CheckoutResponse, OrderResponse,
};
use crate::web::state::AppState;

/// Pre-flight check of a cart. Never reserves anything.
#[utoipa::path(
    post,
    path = "/api/cart/validate",
    request_body = CartValidationRequest,
    responses(
        (status = 200, description = "Per-line validation report", body = CartValidationResponse),
        (status = 400, description = "Empty cart, non-positive quantity or malformed body")
    )
)]
pub async fn validate_cart_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CartValidationRequest>, JsonRejection>,
) -> ApiResult<Json<CartValidationResponse>> {
    let Json(req) = payload?;
    let lines: Vec<CartLine> = req.items.iter().map(CartLine::from).collect();
    let validation = state.checkout.validate_cart(&lines).await?;
    Ok(Json(CartValidationResponse {
        valid: validation.all_valid,
        items: validation.lines.iter().map(CartLineReport::from).collect(),
    }))
}

/// Places an order. A bearer token is optional; when present and valid the order
/// is attached to that user.
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Order confirmed", body = CheckoutResponse),
        (status = 400, description = "Invalid cart, insufficient stock, oversized total or declined payment"),
        (status = 409, description = "Stock taken by a concurrent checkout"),
        (status = 500, description = "Internal server error")
    ),
    security((), ("bearer" = []))
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    payload: Result<Json<CheckoutPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let receipt = state.checkout.checkout(payload.into_request(caller.user_id())).await?;
    info!(
        order_number = %receipt.order_number,
        user_id = ?caller.user_id(),
        "order placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            success: true,
            order_number: receipt.order_number,
            total_amount: receipt.total_amount,
            status: receipt.status.as_str().to_string(),
            payment_id: receipt.payment_id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_number}",
    params(("order_number" = String, Path, description = "The public order number")),
    responses(
        (status = 200, description = "The order with its items", body = OrderResponse),
        (status = 404, description = "No such order")
    )
)]
pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    let details = state.db.get_order_by_number(&order_number).await?;
    Ok(Json(OrderResponse::from(details)))
}
