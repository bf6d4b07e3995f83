//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the storefront client and the API
//! server, and their conversions from core domain types.

use chrono::{DateTime, Utc};
use quickcart_core::domain::{
    CartLine, Order, OrderDetails, OrderItem, PaymentMethod, Product, ShippingInfo, User,
};
use quickcart_core::validation::{LineStatus, LineValidation};
use quickcart_core::CheckoutRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Requests Sent FROM the Client
//=========================================================================================

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct CartItemPayload {
    pub product_id: i64,
    pub quantity: i32,
}

impl From<&CartItemPayload> for CartLine {
    fn from(value: &CartItemPayload) -> Self {
        CartLine {
            product_id: value.product_id,
            quantity: value.quantity,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, ToSchema)]
pub struct ShippingPayload {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl From<ShippingPayload> for ShippingInfo {
    fn from(value: ShippingPayload) -> Self {
        ShippingInfo {
            address: value.address,
            city: value.city,
            state: value.state,
            zip: value.zip,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CartValidationRequest {
    #[serde(default)]
    pub items: Vec<CartItemPayload>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CheckoutPayload {
    pub items: Vec<CartItemPayload>,
    pub shipping_info: Option<ShippingPayload>,
    /// `stripe` (default), `paypal`, `apple_pay`, or any other tag.
    pub payment_method: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub payment_details: Option<serde_json::Value>,
}

impl CheckoutPayload {
    pub fn into_request(self, user_id: Option<i64>) -> CheckoutRequest {
        CheckoutRequest {
            lines: self.items.iter().map(CartLine::from).collect(),
            shipping: self.shipping_info.map(ShippingInfo::from),
            payment_method: PaymentMethod::from_tag(self.payment_method.as_deref()),
            payment_details: self.payment_details.map(|v| v.to_string()),
            user_id,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ProfileUpdateRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

//=========================================================================================
// Responses Sent FROM the Server
//=========================================================================================

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        let is_available = p.is_available();
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            image_url: p.image_url,
            stock_quantity: p.stock_quantity,
            is_available,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

/// One line of a cart validation report.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CartLineReport {
    pub product_id: i64,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
}

impl From<&LineValidation> for CartLineReport {
    fn from(line: &LineValidation) -> Self {
        let (available_quantity, current_price) = match line.status {
            LineStatus::Valid { unit_price } => (None, Some(unit_price)),
            LineStatus::InsufficientStock { available } => (Some(available), None),
            LineStatus::ProductNotFound => (None, None),
        };
        Self {
            product_id: line.product_id,
            valid: line.is_valid(),
            error: line.error_message(),
            available_quantity,
            current_price,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CartValidationResponse {
    pub valid: bool,
    pub items: Vec<CartLineReport>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_id: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.unit_price,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub total_amount: Decimal,
    pub status: String,
    pub shipping_info: ShippingPayload,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let Order {
            id,
            order_number,
            user_id,
            total_amount,
            status,
            shipping,
            payment_id,
            created_at,
        } = details.order;
        Self {
            id,
            order_number,
            user_id,
            total_amount,
            status: status.as_str().to_string(),
            shipping_info: ShippingPayload {
                address: shipping.address,
                city: shipping.city,
                state: shipping.state,
                zip: shipping.zip,
            },
            payment_id,
            created_at,
            items: details.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

/// The public view of a user; never includes the password hash.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CurrentUserResponse {
    pub user: UserResponse,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub orders: Vec<OrderResponse>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProfileUpdateResponse {
    pub success: bool,
    pub user: UserResponse,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcart_core::validation::validate_cart;

    #[test]
    fn line_report_omits_absent_fields() {
        let validation = validate_cart(&[CartLine { product_id: 7, quantity: 1 }], &[]);
        let report = CartLineReport::from(&validation.lines[0]);
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["valid"], false);
        assert_eq!(json["error"], "Product 7 not found");
        assert!(json.get("available_quantity").is_none());
        assert!(json.get("current_price").is_none());
    }

    #[test]
    fn checkout_payload_defaults_payment_method() {
        let payload: CheckoutPayload = serde_json::from_value(serde_json::json!({
            "items": [{"product_id": 1, "quantity": 2}],
            "payment_details": {"card": "4242"}
        }))
        .expect("deserialize");
        let request = payload.into_request(Some(5));
        assert_eq!(request.payment_method, PaymentMethod::Stripe);
        assert_eq!(request.user_id, Some(5));
        assert_eq!(request.lines, vec![CartLine { product_id: 1, quantity: 2 }]);
        assert_eq!(request.payment_details.as_deref(), Some(r#"{"card":"4242"}"#));
    }
}
