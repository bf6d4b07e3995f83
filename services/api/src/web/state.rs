//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use quickcart_core::ports::{DatabaseService, PasswordHasher, TokenService};
use quickcart_core::CheckoutService;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub checkout: CheckoutService,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordHasher>,
}
