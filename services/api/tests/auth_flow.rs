mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;

fn registration(email: &str, password: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": password,
        "first_name": "Test",
        "last_name": "User"
    })
}

#[tokio::test]
async fn register_returns_token_and_public_user() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/auth/register", registration("  Test@Example.com ", "password123"))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "test@example.com");
    assert_eq!(body["user"]["first_name"], "Test");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_validates_input() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/auth/register", json!({"email": "a@example.com", "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "first_name is required");

    let (status, body) = app
        .post("/api/auth/register", registration("invalid-email", "password123"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email format");

    let (status, body) = app
        .post("/api/auth/register", registration("short@example.com", "123"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new();
    app.register("dup@example.com").await;

    let (status, body) = app
        .post("/api/auth/register", registration("DUP@example.com", "password123"))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");
}

#[tokio::test]
async fn login_checks_credentials() {
    let app = TestApp::new();
    app.register("login@example.com").await;

    let (status, body) = app
        .post("/api/auth/login", json!({"email": "Login@Example.com", "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "login@example.com");

    let (status, body) = app
        .post("/api/auth/login", json!({"email": "login@example.com", "password": "wrong-password"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = app
        .post("/api/auth/login", json!({"email": "nobody@example.com", "password": "password123"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post("/api/auth/login", json!({"email": "login@example.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token is missing");

    let (status, body) = app
        .send(Method::GET, "/api/user/profile", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token is invalid or expired");

    let expired = app
        .tokens
        .issue_at(1, "old@example.com", Utc::now() - Duration::hours(25))
        .expect("issue")
        .token;
    let (status, _) = app.send(Method::GET, "/api/auth/me", None, Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_a_deleted_user_is_rejected() {
    let app = TestApp::new();
    let ghost = app.tokens.issue_at(4242, "ghost@example.com", Utc::now()).expect("issue").token;

    let (status, body) = app.send(Method::GET, "/api/auth/me", None, Some(&ghost)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn me_and_logout_with_a_valid_token() {
    let app = TestApp::new();
    let token = app.register("me@example.com").await;

    let (status, body) = app.send(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "me@example.com");

    let (status, body) = app.send(Method::POST, "/api/auth/logout", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn authenticated_checkout_shows_up_in_the_profile() {
    let app = TestApp::new();
    let token = app.register("buyer@example.com").await;
    let product = app.add_product("Notebook Set", dec!(18.99), 40).await;

    let (status, placed) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(json!({"items": [{"product_id": product, "quantity": 3}]})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, profile) = app.send(Method::GET, "/api/user/profile", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = profile["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order_number"], placed["order_number"]);
    assert_eq!(orders[0]["total_amount"], "56.97");
    assert_eq!(orders[0]["user_id"], profile["user"]["id"]);
}

#[tokio::test]
async fn checkout_with_a_bad_token_proceeds_anonymously() {
    let app = TestApp::new();
    let product = app.add_product("Mug", dec!(12.99), 5).await;

    let (status, placed) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(json!({"items": [{"product_id": product, "quantity": 1}]})),
            Some("garbage"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let number = placed["order_number"].as_str().unwrap();
    let (_, order) = app.get(&format!("/api/orders/{number}")).await;
    assert_eq!(order["user_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn profile_update_trims_and_guards_email() {
    let app = TestApp::new();
    app.register("taken@example.com").await;
    let token = app.register("mine@example.com").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/user/profile",
            Some(json!({"first_name": "  Jane  ", "email": "New@Example.com"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["first_name"], "Jane");
    assert_eq!(body["user"]["last_name"], "User");
    assert_eq!(body["user"]["email"], "new@example.com");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/user/profile",
            Some(json!({"email": "taken@example.com"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email is already taken");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/user/profile",
            Some(json!({"email": "bad"})),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
