//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint and the master definition for the OpenAPI
//! specification.

use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::web::protocol::*;
use crate::web::{auth, catalog, orders, profile};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        catalog::list_products_handler,
        catalog::get_product_handler,
        catalog::list_categories_handler,
        orders::validate_cart_handler,
        orders::checkout_handler,
        orders::get_order_handler,
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        auth::logout_handler,
        profile::get_profile_handler,
        profile::update_profile_handler,
    ),
    components(
        schemas(
            CartItemPayload, ShippingPayload, CartValidationRequest, CheckoutPayload,
            RegisterRequest, LoginRequest, ProfileUpdateRequest, ProductResponse,
            ProductListResponse, CategoriesResponse, CartLineReport, CartValidationResponse,
            CheckoutResponse, OrderItemResponse, OrderResponse, UserResponse, AuthResponse,
            CurrentUserResponse, ProfileResponse, ProfileUpdateResponse, LogoutResponse,
            HealthResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "QuickCart API", description = "Catalog, checkout, and account endpoints for the QuickCart storefront.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "quickcart-api".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/products",
            "/api/products/{product_id}",
            "/api/categories",
            "/api/cart/validate",
            "/api/checkout",
            "/api/orders/{order_number}",
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/me",
            "/api/auth/logout",
            "/api/user/profile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
