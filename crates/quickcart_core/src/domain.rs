//! crates/quickcart_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

//=========================================================================================
// Catalog
//=========================================================================================

/// A product in the catalog. Stock is only ever decremented by a checkout reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Everything needed to insert a product; used by seeding.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

/// Filters and paging for a catalog listing. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub page: u32,
    pub per_page: u32,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ProductQuery {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Builds a query, clamping paging values into their allowed ranges.
    pub fn new(
        page: Option<u32>,
        per_page: Option<u32>,
        category: Option<String>,
        search: Option<String>,
    ) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
            category: category.filter(|c| !c.is_empty()),
            search: search.filter(|s| !s.is_empty()),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl ProductPage {
    pub fn pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

//=========================================================================================
// Cart & Orders
//=========================================================================================

/// One `{product_id, quantity}` pair of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingInfo {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A line of an order. `unit_price` is the price snapshot taken at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// An order together with its items.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<i64>,
    pub total_amount: Decimal,
    pub shipping: ShippingInfo,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Generates a human-presentable order number such as `QC-20240131-9F2A61C0`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("QC-{}-{}", now.format("%Y%m%d"), suffix)
}

//=========================================================================================
// Payments
//=========================================================================================

/// The payment methods the gateway knows about, plus a fallback for anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentMethod {
    #[default]
    Stripe,
    Paypal,
    ApplePay,
    Other(String),
}

impl PaymentMethod {
    /// Maps a client-supplied tag onto a method. A missing tag means Stripe.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            None | Some("") | Some("stripe") => PaymentMethod::Stripe,
            Some("paypal") => PaymentMethod::Paypal,
            Some("apple_pay") => PaymentMethod::ApplePay,
            Some(other) => PaymentMethod::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::ApplePay => "apple_pay",
            PaymentMethod::Other(tag) => tag,
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// A partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Normalizes an email for storage and lookup: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The identity carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_defaults_to_stripe() {
        assert_eq!(PaymentMethod::from_tag(None), PaymentMethod::Stripe);
        assert_eq!(PaymentMethod::from_tag(Some("")), PaymentMethod::Stripe);
        assert_eq!(PaymentMethod::from_tag(Some("paypal")), PaymentMethod::Paypal);
        assert_eq!(PaymentMethod::from_tag(Some("apple_pay")), PaymentMethod::ApplePay);
        assert_eq!(
            PaymentMethod::from_tag(Some("venmo")),
            PaymentMethod::Other("venmo".to_string())
        );
    }

    #[test]
    fn product_query_clamps_paging() {
        let query = ProductQuery::new(Some(0), Some(500), Some(String::new()), None);
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, ProductQuery::MAX_PER_PAGE);
        assert!(query.category.is_none());

        let query = ProductQuery::new(Some(3), Some(10), None, None);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn page_count_rounds_up() {
        let page = ProductPage { products: vec![], total: 41, page: 1, per_page: 20 };
        assert_eq!(page.pages(), 3);
        let empty = ProductPage { products: vec![], total: 0, page: 1, per_page: 20 };
        assert_eq!(empty.pages(), 0);
    }

    #[test]
    fn order_number_has_date_and_hex_suffix() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 1, 31, 12, 0, 0).unwrap();
        let number = generate_order_number(now);
        assert!(number.starts_with("QC-20240131-"));
        let suffix = &number["QC-20240131-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Failed] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Test@Example.COM "), "test@example.com");
    }
}
