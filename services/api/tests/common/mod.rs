//! Shared harness for driving the router over the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::{Argon2Hasher, JwtTokenService, MemoryDb, MockPaymentGateway};
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use quickcart_core::domain::NewProduct;
use quickcart_core::ports::DatabaseService;
use quickcart_core::CheckoutService;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub db: MemoryDb,
    pub tokens: JwtTokenService,
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("memory://".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        _ => None,
    })
    .expect("test config")
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::always_approve())
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self::build(gateway, Duration::from_secs(10))
    }

    pub fn build(gateway: MockPaymentGateway, checkout_timeout: Duration) -> Self {
        let config = Arc::new(test_config());
        let db = MemoryDb::new();
        let tokens = JwtTokenService::new(JWT_SECRET, config.token_ttl);
        let shared_db: Arc<dyn DatabaseService> = Arc::new(db.clone());
        let checkout = CheckoutService::new(shared_db.clone(), Arc::new(gateway), checkout_timeout);
        let state = Arc::new(AppState {
            db: shared_db,
            config,
            checkout,
            tokens: Arc::new(tokens.clone()),
            passwords: Arc::new(Argon2Hasher),
        });
        Self {
            router: build_router(state),
            db,
            tokens,
        }
    }

    pub async fn add_product(&self, name: &str, price: Decimal, stock: i32) -> i64 {
        self.db
            .insert_product(NewProduct {
                name: name.to_string(),
                description: None,
                price,
                category: Some("test".to_string()),
                image_url: None,
                stock_quantity: stock,
            })
            .await
            .expect("insert product")
            .id
    }

    pub async fn stock_of(&self, product_id: i64) -> i32 {
        self.db
            .get_product(product_id)
            .await
            .expect("product")
            .stock_quantity
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), None).await
    }

    /// Registers a user and returns their bearer token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                serde_json::json!({
                    "email": email,
                    "password": "password123",
                    "first_name": "Test",
                    "last_name": "User"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().expect("token").to_string()
    }
}
