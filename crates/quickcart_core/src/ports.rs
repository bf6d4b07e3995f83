//! crates/quickcart_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or payment providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Identity, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderDetails, OrderItem,
    PaymentMethod, Product, ProductPage, ProductQuery, User, UserCredentials, UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Ports
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Catalog ---
    async fn list_products(&self, query: &ProductQuery) -> PortResult<ProductPage>;

    async fn get_product(&self, product_id: i64) -> PortResult<Product>;

    /// Non-locking read of the given products. Missing ids are simply absent.
    async fn find_products(&self, product_ids: &[i64]) -> PortResult<Vec<Product>>;

    async fn list_categories(&self) -> PortResult<Vec<String>>;

    async fn count_products(&self) -> PortResult<u64>;

    async fn insert_product(&self, product: NewProduct) -> PortResult<Product>;

    // --- Users ---
    /// Fails with `Conflict` when the (normalized) email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Fails with `Conflict` when the new email belongs to another user.
    async fn update_user(&self, user_id: i64, update: UserUpdate) -> PortResult<User>;

    // --- Orders ---
    async fn get_order_by_number(&self, order_number: &str) -> PortResult<OrderDetails>;

    /// Newest first.
    async fn list_orders_for_user(&self, user_id: i64) -> PortResult<Vec<OrderDetails>>;

    /// Opens the unit of work used by a single checkout attempt.
    async fn begin_checkout(&self) -> PortResult<Box<dyn CheckoutTransaction>>;
}

/// An explicit transaction handle scoped to one checkout call.
///
/// Writes become visible to others only on `commit`. Dropping a handle without
/// committing must discard everything it wrote.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Reads the given products and holds them locked until the transaction ends.
    /// Locks are taken in ascending id order.
    async fn lock_products(&mut self, product_ids: &[i64]) -> PortResult<Vec<Product>>;

    /// Decrements stock. Fails with `Conflict` instead of going below zero.
    async fn reserve_stock(&mut self, product_id: i64, quantity: i32) -> PortResult<()>;

    /// Inserts an order in the `pending` state.
    async fn insert_order(&mut self, order: NewOrder) -> PortResult<Order>;

    async fn insert_order_item(&mut self, item: NewOrderItem) -> PortResult<OrderItem>;

    /// Flips a pending order to `confirmed` and records the payment identifier.
    async fn confirm_order(&mut self, order_id: i64, payment_id: &str) -> PortResult<()>;

    async fn commit(self: Box<Self>) -> PortResult<()>;

    async fn rollback(self: Box<Self>) -> PortResult<()>;
}

//=========================================================================================
// Payment Port
//=========================================================================================

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    /// Client-supplied details, carried as raw JSON text and opaque to the core.
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentDecline {
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("{0}")]
    Declined(String),
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentDecline>;
}

//=========================================================================================
// Auth Ports
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Token is invalid")]
    Invalid,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: i64, email: &str) -> PortResult<IssuedToken>;

    fn verify(&self, token: &str) -> Result<Identity, TokenError>;
}

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> PortResult<String>;

    fn verify(&self, password: &str, password_hash: &str) -> bool;
}
