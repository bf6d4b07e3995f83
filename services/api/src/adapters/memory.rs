//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. A checkout
//! transaction holds the table lock for its whole lifetime and writes to a working
//! copy that only replaces the tables on commit, so checkouts are serializable and
//! an abandoned transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use quickcart_core::domain::{
    normalize_email, NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderDetails, OrderItem,
    OrderStatus, Product, ProductPage, ProductQuery, User, UserCredentials, UserUpdate,
};
use quickcart_core::ports::{CheckoutTransaction, DatabaseService, PortError, PortResult};
use tokio::sync::{Mutex, OwnedMutexGuard};

//=========================================================================================
// Tables
//=========================================================================================

#[derive(Clone, Default)]
struct Tables {
    products: BTreeMap<i64, Product>,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
    users: BTreeMap<i64, UserCredentials>,
    last_product_id: i64,
    last_order_id: i64,
    last_order_item_id: i64,
    last_user_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn order_details(&self, order: &Order) -> OrderDetails {
        let items = self
            .order_items
            .values()
            .filter(|item| item.order_id == order.id)
            .cloned()
            .collect();
        OrderDetails {
            order: order.clone(),
            items,
        }
    }

    fn user_id_by_email(&self, email: &str) -> Option<i64> {
        self.users
            .values()
            .find(|creds| creds.user.email == email)
            .map(|creds| creds.user.id)
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Number of persisted order items.
    pub async fn order_item_count(&self) -> usize {
        self.tables.lock().await.order_items.len()
    }

    /// Overwrites a product's price, as a catalog admin would.
    pub async fn set_price(&self, product_id: i64, price: rust_decimal::Decimal) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let product = tables
            .products
            .get_mut(&product_id)
            .ok_or_else(|| PortError::NotFound(format!("Product {} not found", product_id)))?;
        product.price = price;
        Ok(())
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn list_products(&self, query: &ProductQuery) -> PortResult<ProductPage> {
        let tables = self.tables.lock().await;
        let search = query.search.as_ref().map(|s| s.to_lowercase());
        let matching: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| match &query.category {
                Some(category) => p.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .filter(|p| match &search {
                Some(needle) => p.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect();

        let total = matching.len() as u64;
        let products = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(ProductPage {
            products,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn get_product(&self, product_id: i64) -> PortResult<Product> {
        self.tables
            .lock()
            .await
            .products
            .get(&product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Product {} not found", product_id)))
    }

    async fn find_products(&self, product_ids: &[i64]) -> PortResult<Vec<Product>> {
        let tables = self.tables.lock().await;
        Ok(product_ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn list_categories(&self) -> PortResult<Vec<String>> {
        let tables = self.tables.lock().await;
        let mut categories: Vec<String> = tables
            .products
            .values()
            .filter_map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn count_products(&self) -> PortResult<u64> {
        Ok(self.tables.lock().await.products.len() as u64)
    }

    async fn insert_product(&self, product: NewProduct) -> PortResult<Product> {
        let mut tables = self.tables.lock().await;
        let id = next_id(&mut tables.last_product_id);
        let record = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            image_url: product.image_url,
            stock_quantity: product.stock_quantity,
            created_at: Utc::now(),
        };
        tables.products.insert(id, record.clone());
        Ok(record)
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        let email = normalize_email(&user.email);
        if tables.user_id_by_email(&email).is_some() {
            return Err(PortError::Conflict("User with this email already exists".to_string()));
        }
        let id = next_id(&mut tables.last_user_id);
        let record = User {
            id,
            email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: Utc::now(),
        };
        tables.users.insert(
            id,
            UserCredentials {
                user: record.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(record)
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        self.tables
            .lock()
            .await
            .users
            .get(&user_id)
            .map(|creds| creds.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().await;
        let email = normalize_email(email);
        tables
            .user_id_by_email(&email)
            .and_then(|id| tables.users.get(&id).cloned())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn update_user(&self, user_id: i64, update: UserUpdate) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        let new_email = update.email.as_deref().map(normalize_email);
        if let Some(email) = &new_email {
            if matches!(tables.user_id_by_email(email), Some(owner) if owner != user_id) {
                return Err(PortError::Conflict("Email is already taken".to_string()));
            }
        }
        let creds = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(email) = new_email {
            creds.user.email = email;
        }
        if let Some(first_name) = update.first_name {
            creds.user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            creds.user.last_name = last_name;
        }
        Ok(creds.user.clone())
    }

    async fn get_order_by_number(&self, order_number: &str) -> PortResult<OrderDetails> {
        let tables = self.tables.lock().await;
        tables
            .orders
            .values()
            .find(|order| order.order_number == order_number)
            .map(|order| tables.order_details(order))
            .ok_or_else(|| PortError::NotFound(format!("Order {} not found", order_number)))
    }

    async fn list_orders_for_user(&self, user_id: i64) -> PortResult<Vec<OrderDetails>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<&Order> = tables
            .orders
            .values()
            .filter(|order| order.user_id == Some(user_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders.into_iter().map(|order| tables.order_details(order)).collect())
    }

    async fn begin_checkout(&self) -> PortResult<Box<dyn CheckoutTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

//=========================================================================================
// Checkout Transaction
//=========================================================================================

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl CheckoutTransaction for MemoryTransaction {
    async fn lock_products(&mut self, product_ids: &[i64]) -> PortResult<Vec<Product>> {
        let mut ids = product_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| self.working.products.get(id).cloned())
            .collect())
    }

    async fn reserve_stock(&mut self, product_id: i64, quantity: i32) -> PortResult<()> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| PortError::NotFound(format!("Product {} not found", product_id)))?;
        if product.stock_quantity < quantity {
            return Err(PortError::Conflict(format!(
                "Stock for product {} was exhausted by another order",
                product_id
            )));
        }
        product.stock_quantity -= quantity;
        Ok(())
    }

    async fn insert_order(&mut self, order: NewOrder) -> PortResult<Order> {
        if self
            .working
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(PortError::Conflict(format!(
                "Order number {} already exists",
                order.order_number
            )));
        }
        let id = next_id(&mut self.working.last_order_id);
        let record = Order {
            id,
            order_number: order.order_number,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            shipping: order.shipping,
            payment_id: None,
            created_at: Utc::now(),
        };
        self.working.orders.insert(id, record.clone());
        Ok(record)
    }

    async fn insert_order_item(&mut self, item: NewOrderItem) -> PortResult<OrderItem> {
        if !self.working.orders.contains_key(&item.order_id) {
            return Err(PortError::NotFound(format!("Order {} not found", item.order_id)));
        }
        let id = next_id(&mut self.working.last_order_item_id);
        let record = OrderItem {
            id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        };
        self.working.order_items.insert(id, record.clone());
        Ok(record)
    }

    async fn confirm_order(&mut self, order_id: i64, payment_id: &str) -> PortResult<()> {
        let order = self
            .working
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| PortError::NotFound(format!("Order {} not found", order_id)))?;
        order.status = OrderStatus::Confirmed;
        order.payment_id = Some(payment_id.to_string());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        // The working copy is discarded with the handle.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcart_core::domain::ShippingInfo;
    use rust_decimal_macros::dec;

    async fn seeded() -> MemoryDb {
        let db = MemoryDb::new();
        db.insert_product(NewProduct {
            name: "Coffee Mug".into(),
            description: None,
            price: dec!(12.99),
            category: Some("home".into()),
            image_url: None,
            stock_quantity: 3,
        })
        .await
        .expect("insert");
        db
    }

    fn new_order(number: &str) -> NewOrder {
        NewOrder {
            order_number: number.into(),
            user_id: None,
            total_amount: dec!(12.99),
            shipping: ShippingInfo::default(),
        }
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let db = seeded().await;
        let mut tx = db.begin_checkout().await.expect("begin");
        tx.reserve_stock(1, 1).await.expect("reserve");
        let order = tx.insert_order(new_order("QC-1")).await.expect("order");
        tx.confirm_order(order.id, "pi_x").await.expect("confirm");
        tx.commit().await.expect("commit");

        assert_eq!(db.get_product(1).await.expect("product").stock_quantity, 2);
        let stored = db.get_order_by_number("QC-1").await.expect("order");
        assert_eq!(stored.order.status, OrderStatus::Confirmed);
        assert_eq!(stored.order.payment_id.as_deref(), Some("pi_x"));
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let db = seeded().await;
        {
            let mut tx = db.begin_checkout().await.expect("begin");
            tx.reserve_stock(1, 2).await.expect("reserve");
            tx.insert_order(new_order("QC-2")).await.expect("order");
        }
        assert_eq!(db.get_product(1).await.expect("product").stock_quantity, 3);
        assert_eq!(db.order_count().await, 0);
    }

    #[tokio::test]
    async fn reserve_never_goes_negative() {
        let db = seeded().await;
        let mut tx = db.begin_checkout().await.expect("begin");
        let err = tx.reserve_stock(1, 4).await.expect_err("should conflict");
        assert!(matches!(err, PortError::Conflict(_)));
        tx.rollback().await.expect("rollback");
        assert_eq!(db.get_product(1).await.expect("product").stock_quantity, 3);
    }

    #[tokio::test]
    async fn emails_are_unique_ignoring_case() {
        let db = MemoryDb::new();
        let new_user = |email: &str| NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
        };
        db.create_user(new_user("Test@Example.com")).await.expect("create");
        let err = db
            .create_user(new_user("test@example.COM"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, PortError::Conflict(_)));
        assert!(db.get_user_by_email(" TEST@example.com ").await.is_ok());
    }
}
