//! services/api/src/web/mod.rs
//!
//! HTTP surface of the service and the router that ties it together.

pub mod auth;
pub mod catalog;
pub mod middleware;
pub mod orders;
pub mod profile;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub use middleware::{optional_auth, require_auth, CurrentUser, MaybeUser};
pub use rest::ApiDoc;
pub use state::AppState;

const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

/// CORS for the local dev frontends plus the configured `FRONTEND_URL`.
pub fn cors_layer(frontend_url: &str) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in DEV_ORIGINS.iter().copied().chain(std::iter::once(frontend_url)) {
        match origin.parse::<HeaderValue>() {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(e) => warn!(origin, error = %e, "ignoring unusable CORS origin"),
        }
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds the `/api` router with auth layers applied per route group.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/products", get(catalog::list_products_handler))
        .route("/api/products/{product_id}", get(catalog::get_product_handler))
        .route("/api/categories", get(catalog::list_categories_handler))
        .route("/api/cart/validate", post(orders::validate_cart_handler))
        .route("/api/orders/{order_number}", get(orders::get_order_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler));

    // Routes where a token is optional
    let optional_routes = Router::new()
        .route("/api/checkout", post(orders::checkout_handler))
        .layer(axum_middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/user/profile",
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config.frontend_url))
        .with_state(state)
}
