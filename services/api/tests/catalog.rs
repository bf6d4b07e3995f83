mod common;

use api_lib::adapters::seed::seed_if_empty;
use axum::http::StatusCode;
use common::TestApp;

async fn seeded() -> TestApp {
    let app = TestApp::new();
    seed_if_empty(&app.db).await.expect("seed");
    app
}

#[tokio::test]
async fn health_reports_service_name() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "quickcart-api");
}

#[tokio::test]
async fn lists_products_with_paging() {
    let app = seeded().await;

    let (status, body) = app.get("/api/products?page=2&per_page=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["pages"], 3);
    assert_eq!(body["current_page"], 2);
    assert_eq!(body["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn filters_by_category_and_search() {
    let app = seeded().await;

    let (_, electronics) = app.get("/api/products?category=electronics").await;
    assert_eq!(electronics["total"], 2);

    let (_, mugs) = app.get("/api/products?search=Mug").await;
    let products = mugs["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Coffee Mug");
    assert_eq!(products[0]["price"], "12.99");
    assert_eq!(products[0]["is_available"], true);
}

#[tokio::test]
async fn oversized_page_requests_are_capped() {
    let app = seeded().await;
    let (status, body) = app.get("/api/products?per_page=1000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pages"], 1);
}

#[tokio::test]
async fn product_detail_and_missing_product() {
    let app = seeded().await;
    let (_, page) = app.get("/api/products?per_page=1").await;
    let id = page["products"][0]["id"].as_i64().unwrap();

    let (status, product) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["id"], id);

    let (status, _) = app.get("/api/products/987654").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_distinct() {
    let app = seeded().await;
    let (status, body) = app.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    let mut categories: Vec<String> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    categories.sort();
    assert_eq!(categories, vec!["electronics", "home", "office", "sports"]);
}
