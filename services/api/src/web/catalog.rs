//! services/api/src/web/catalog.rs
//!
//! Read-only catalog endpoints: product listing, product detail, and categories.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use quickcart_core::domain::ProductQuery;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::error::ApiResult;
use crate::web::protocol::{CategoriesResponse, ProductListResponse, ProductResponse};
use crate::web::state::AppState;

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, at most 100.
    pub per_page: Option<u32>,
    /// Exact category match.
    pub category: Option<String>,
    /// Substring match on the product name.
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "One page of products", body = ProductListResponse)
    )
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductListParams>,
) -> ApiResult<Json<ProductListResponse>> {
    let query = ProductQuery::new(params.page, params.per_page, params.category, params.search);
    let page = state.db.list_products(&query).await?;
    let pages = page.pages();
    Ok(Json(ProductListResponse {
        products: page.products.into_iter().map(ProductResponse::from).collect(),
        total: page.total,
        pages,
        current_page: page.page,
    }))
}

#[utoipa::path(
    get,
    path = "/api/products/{product_id}",
    params(("product_id" = i64, Path, description = "The product id")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "No such product")
    )
)]
pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state.db.get_product(product_id).await?;
    Ok(Json(ProductResponse::from(product)))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Distinct, non-empty categories", body = CategoriesResponse)
    )
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CategoriesResponse>> {
    let categories = state.db.list_categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}
