//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quickcart_core::domain::{
    normalize_email, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderDetails, OrderItem,
    OrderStatus, Product, ProductPage, ProductQuery, ShippingInfo, User, UserCredentials,
    UserUpdate,
};
use quickcart_core::ports::{CheckoutTransaction, DatabaseService, PortError, PortResult};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Maps unique-constraint violations to `Conflict` and everything else to `Unexpected`.
fn conflict_or_unexpected(e: sqlx::Error, conflict_message: &str) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return PortError::Conflict(conflict_message.to_string());
        }
    }
    unexpected(e)
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, image_url, stock_quantity, created_at";
const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";
const ORDER_COLUMNS: &str = "id, order_number, user_id, total_amount, status, shipping_address, \
     shipping_city, shipping_state, shipping_zip, payment_id, created_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price";

#[derive(FromRow)]
struct ProductRecord {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    category: Option<String>,
    image_url: Option<String>,
    stock_quantity: i32,
    created_at: DateTime<Utc>,
}
impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            image_url: self.image_url,
            stock_quantity: self.stock_quantity,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }

    fn to_domain(self) -> User {
        self.to_credentials().user
    }
}

#[derive(FromRow)]
struct OrderRecord {
    id: i64,
    order_number: String,
    user_id: Option<i64>,
    total_amount: Decimal,
    status: String,
    shipping_address: Option<String>,
    shipping_city: Option<String>,
    shipping_state: Option<String>,
    shipping_zip: Option<String>,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
}
impl OrderRecord {
    fn to_domain(self) -> PortResult<Order> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown order status '{}'", self.status))
        })?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            total_amount: self.total_amount,
            status,
            shipping: ShippingInfo {
                address: self.shipping_address,
                city: self.shipping_city,
                state: self.shipping_state,
                zip: self.shipping_zip,
            },
            payment_id: self.payment_id,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRecord {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    unit_price: Decimal,
}
impl OrderItemRecord {
    fn to_domain(self) -> OrderItem {
        OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

impl DbAdapter {
    async fn attach_items(&self, orders: Vec<OrderRecord>) -> PortResult<Vec<OrderDetails>> {
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItemRecord>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item.to_domain());
        }

        orders
            .into_iter()
            .map(|record| {
                let items = by_order.remove(&record.id).unwrap_or_default();
                Ok(OrderDetails {
                    order: record.to_domain()?,
                    items,
                })
            })
            .collect()
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn list_products(&self, query: &ProductQuery) -> PortResult<ProductPage> {
        let filter = "($1::TEXT IS NULL OR category = $1) \
                      AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products WHERE {filter}"
        ))
        .bind(&query.category)
        .bind(&query.search)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {filter} ORDER BY id LIMIT $3 OFFSET $4"
        ))
        .bind(&query.category)
        .bind(&query.search)
        .bind(i64::from(query.per_page))
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(ProductPage {
            products: records.into_iter().map(|r| r.to_domain()).collect(),
            total: total.max(0) as u64,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn get_product(&self, product_id: i64) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Product {} not found", product_id)))?;
        Ok(record.to_domain())
    }

    async fn find_products(&self, product_ids: &[i64]) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_categories(&self) -> PortResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products \
             WHERE category IS NOT NULL AND category <> '' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn count_products(&self) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(&format!(
            "INSERT INTO products (name, description, price, category, image_url, stock_quantity) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.image_url)
        .bind(product.stock_quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "User with this email already exists"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let email = normalize_email(email);
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"
        ))
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn update_user(&self, user_id: i64, update: UserUpdate) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 first_name = COALESCE($3, first_name), \
                 last_name = COALESCE($4, last_name) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.email.as_deref().map(normalize_email))
        .bind(&update.first_name)
        .bind(&update.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            other => conflict_or_unexpected(other, "Email is already taken"),
        })?;
        Ok(record.to_domain())
    }

    async fn get_order_by_number(&self, order_number: &str) -> PortResult<OrderDetails> {
        let record = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Order {} not found", order_number)))?;

        let mut details = self.attach_items(vec![record]).await?;
        details
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Order {} not found", order_number)))
    }

    async fn list_orders_for_user(&self, user_id: i64) -> PortResult<Vec<OrderDetails>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        self.attach_items(records).await
    }

    async fn begin_checkout(&self) -> PortResult<Box<dyn CheckoutTransaction>> {
        let tx = self.pool.begin().await.map_err(unexpected)?;
        Ok(Box::new(PgCheckoutTransaction { tx }))
    }
}

//=========================================================================================
// Checkout Transaction
//=========================================================================================

/// Wraps a live Postgres transaction. sqlx rolls it back if it is dropped uncommitted.
struct PgCheckoutTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTransaction for PgCheckoutTransaction {
    async fn lock_products(&mut self, product_ids: &[i64]) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(product_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn reserve_stock(&mut self, product_id: i64, quantity: i32) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $1 \
             WHERE id = $2 AND stock_quantity >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::Conflict(format!(
                "Stock for product {} was exhausted by another order",
                product_id
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> PortResult<Order> {
        let record = sqlx::query_as::<_, OrderRecord>(&format!(
            "INSERT INTO orders (order_number, user_id, total_amount, status, \
                 shipping_address, shipping_city, shipping_state, shipping_zip) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.total_amount)
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.state)
        .bind(&order.shipping.zip)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_or_unexpected(e, "Order number already exists"))?;
        record.to_domain()
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> PortResult<OrderItem> {
        let record = sqlx::query_as::<_, OrderItemRecord>(&format!(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4) RETURNING {ORDER_ITEM_COLUMNS}"
        ))
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn confirm_order(&mut self, order_id: i64, payment_id: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $1, payment_id = $2 WHERE id = $3")
            .bind(OrderStatus::Confirmed.as_str())
            .bind(payment_id)
            .bind(order_id)
            .execute(&mut *self.tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Order {} not found", order_id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        self.tx.commit().await.map_err(unexpected)
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        self.tx.rollback().await.map_err(unexpected)
    }
}
