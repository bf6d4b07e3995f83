//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        seed::seed_if_empty, Argon2Hasher, DbAdapter, JwtTokenService, MemoryDb,
        MockPaymentGateway, ThreadRngRoll,
    },
    config::Config,
    error::ApiError,
    web::{build_router, rest::ApiDoc, state::AppState},
};
use quickcart_core::ports::DatabaseService;
use quickcart_core::CheckoutService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn connect_store(config: &Config) -> Result<Arc<dyn DatabaseService>, ApiError> {
    if config.uses_memory_store() {
        info!("Using the in-memory store; data will not survive a restart.");
        return Ok(Arc::new(MemoryDb::new()));
    }

    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");
    Ok(Arc::new(db_adapter))
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Storage & Seed ---
    let db = connect_store(&config).await?;
    if config.seed_sample_data {
        seed_if_empty(db.as_ref()).await?;
    }

    // --- 3. Initialize Service Adapters ---
    let payments = Arc::new(MockPaymentGateway::new(
        config.payment_failure_rate,
        config.payment_delay,
        Arc::new(ThreadRngRoll),
    ));
    let checkout = CheckoutService::new(db.clone(), payments, config.checkout_timeout);
    let tokens = Arc::new(JwtTokenService::new(&config.jwt_secret, config.token_ttl));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db,
        config: config.clone(),
        checkout,
        tokens,
        passwords: Arc::new(Argon2Hasher),
    });

    // --- 5. Create the Web Router ---
    let app = build_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
