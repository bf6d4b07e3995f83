//! crates/quickcart_core/src/checkout.rs
//!
//! The checkout engine. One call to [`CheckoutService::checkout`] is one unit of
//! work: re-validate the cart over locked rows, reserve stock, write the order and
//! its items, take payment, then commit everything or nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::domain::{
    generate_order_number, CartLine, NewOrder, NewOrderItem, OrderItem, OrderStatus,
    PaymentMethod, Product, ShippingInfo,
};
use crate::money;
use crate::ports::{
    CheckoutTransaction, DatabaseService, PaymentDecline, PaymentRequest, PaymentService,
    PortError,
};
use crate::validation::{
    check_cart_shape, referenced_product_ids, validate_cart, CartShapeError, CartValidation,
    LineStatus,
};

//=========================================================================================
// Request, Receipt, Stages and Errors
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLine>,
    pub shipping: Option<ShippingInfo>,
    pub payment_method: PaymentMethod,
    /// Raw JSON handed through to the payment provider.
    pub payment_details: Option<String>,
    /// Set when the caller presented a valid token.
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_id: String,
    pub items: Vec<OrderItem>,
}

/// The states a checkout attempt moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Initiated,
    ItemsValidated,
    StockReserved,
    PaymentAttempted,
    Committed,
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    InvalidCart(#[from] CartShapeError),

    #[error("Product {product_id} not found")]
    ProductNotFound {
        product_id: i64,
        validation: CartValidation,
    },

    #[error("Insufficient stock for {name}. Available: {available}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i32,
        validation: CartValidation,
    },

    #[error("Order total {total} exceeds the maximum of {max}", max = money::MAX_ORDER_TOTAL)]
    TotalTooLarge { total: Decimal },

    #[error("Payment failed: {0}")]
    PaymentFailed(PaymentDecline),

    #[error("Checkout did not complete within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Storage(#[from] PortError),
}

impl CheckoutError {
    /// The per-line validation behind a cart rejection, if this is one.
    pub fn validation(&self) -> Option<&CartValidation> {
        match self {
            CheckoutError::ProductNotFound { validation, .. }
            | CheckoutError::InsufficientStock { validation, .. } => Some(validation),
            _ => None,
        }
    }
}

//=========================================================================================
// The Checkout Service
//=========================================================================================

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<dyn DatabaseService>,
    payments: Arc<dyn PaymentService>,
    timeout: Duration,
}

impl CheckoutService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        payments: Arc<dyn PaymentService>,
        timeout: Duration,
    ) -> Self {
        Self { db, payments, timeout }
    }

    /// Pre-flight validation. Reads without locking and changes nothing; only the
    /// re-check inside [`checkout`](Self::checkout) may lead to a reservation.
    pub async fn validate_cart(&self, lines: &[CartLine]) -> Result<CartValidation, CheckoutError> {
        check_cart_shape(lines)?;
        let ids = referenced_product_ids(lines);
        let products = self.db.find_products(&ids).await?;
        Ok(validate_cart(lines, &products))
    }

    /// Runs one checkout attempt.
    ///
    /// The timeout covers everything up to the commit. On any error the
    /// transaction is rolled back before this returns. If the attempt outlives the
    /// timeout its future is dropped, which drops the transaction handle and
    /// discards its writes. Once the commit has started its outcome is reported
    /// as is.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
        check_cart_shape(&request.lines)?;
        debug!(stage = ?CheckoutStage::Initiated, lines = request.lines.len(), "checkout started");

        let (tx, receipt) = match tokio::time::timeout(self.timeout, self.prepare(&request)).await {
            Ok(prepared) => prepared?,
            Err(_) => {
                warn!(
                    stage = ?CheckoutStage::Aborted,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "checkout timed out, transaction discarded"
                );
                return Err(CheckoutError::TimedOut(self.timeout));
            }
        };

        tx.commit().await?;
        info!(
            stage = ?CheckoutStage::Committed,
            order_id = receipt.order_id,
            order_number = %receipt.order_number,
            total = %receipt.total_amount,
            "checkout committed"
        );
        Ok(receipt)
    }

    /// Opens the transaction and runs the attempt in it. Hands back the still
    /// open transaction on success; rolls it back on failure.
    async fn prepare(
        &self,
        request: &CheckoutRequest,
    ) -> Result<(Box<dyn CheckoutTransaction>, CheckoutReceipt), CheckoutError> {
        let mut tx = self.db.begin_checkout().await?;
        let mut stage = CheckoutStage::Initiated;

        match self.attempt(tx.as_mut(), request, &mut stage).await {
            Ok(receipt) => Ok((tx, receipt)),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "failed to roll back checkout transaction");
                }
                warn!(stage = ?CheckoutStage::Aborted, failed_after = ?stage, error = %err, "checkout aborted");
                Err(err)
            }
        }
    }

    async fn attempt(
        &self,
        tx: &mut dyn CheckoutTransaction,
        request: &CheckoutRequest,
        stage: &mut CheckoutStage,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        // 1. Re-validate over locked rows. This check is the authoritative one.
        let ids = referenced_product_ids(&request.lines);
        let products = tx.lock_products(&ids).await?;
        let validation = validate_cart(&request.lines, &products);
        reject_invalid(validation.clone(), &products)?;
        *stage = CheckoutStage::ItemsValidated;
        debug!(stage = ?stage, "cart re-validated");

        // 2. Price every line from the snapshot just taken, then reserve.
        let priced: Vec<(i64, i32, Decimal)> = validation
            .lines
            .iter()
            .filter_map(|line| match line.status {
                LineStatus::Valid { unit_price } => Some((line.product_id, line.requested, unit_price)),
                _ => None,
            })
            .collect();
        let total_amount = money::order_total(priced.iter().map(|(_, qty, price)| (*price, *qty)));
        if !money::within_order_limit(total_amount) {
            return Err(CheckoutError::TotalTooLarge { total: total_amount });
        }
        for (product_id, quantity, _) in &priced {
            tx.reserve_stock(*product_id, *quantity).await?;
        }

        let order = tx
            .insert_order(NewOrder {
                order_number: generate_order_number(Utc::now()),
                user_id: request.user_id,
                total_amount,
                shipping: request.shipping.clone().unwrap_or_default(),
            })
            .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (product_id, quantity, unit_price) in priced {
            let item = tx
                .insert_order_item(NewOrderItem {
                    order_id: order.id,
                    product_id,
                    quantity,
                    unit_price,
                })
                .await?;
            items.push(item);
        }
        *stage = CheckoutStage::StockReserved;
        debug!(stage = ?stage, order_number = %order.order_number, total = %total_amount, "stock reserved");

        // 3. Take payment while the reservation is still uncommitted.
        *stage = CheckoutStage::PaymentAttempted;
        let receipt = self
            .payments
            .process_payment(PaymentRequest {
                amount: total_amount,
                method: request.payment_method.clone(),
                details: request.payment_details.clone(),
            })
            .await
            .map_err(CheckoutError::PaymentFailed)?;
        debug!(stage = ?stage, payment_id = %receipt.payment_id, "payment accepted");

        // 4. Confirm; the caller commits.
        tx.confirm_order(order.id, &receipt.payment_id).await?;

        Ok(CheckoutReceipt {
            order_id: order.id,
            order_number: order.order_number,
            total_amount,
            status: OrderStatus::Confirmed,
            payment_id: receipt.payment_id,
            items,
        })
    }
}

/// Turns the first failing line into the matching error.
fn reject_invalid(validation: CartValidation, products: &[Product]) -> Result<(), CheckoutError> {
    let Some(line) = validation.first_invalid().cloned() else {
        return Ok(());
    };
    match line.status {
        LineStatus::ProductNotFound => Err(CheckoutError::ProductNotFound {
            product_id: line.product_id,
            validation,
        }),
        LineStatus::InsufficientStock { available } => {
            let name = products
                .iter()
                .find(|p| p.id == line.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("product {}", line.product_id));
            Err(CheckoutError::InsufficientStock {
                product_id: line.product_id,
                name,
                available,
                validation,
            })
        }
        LineStatus::Valid { .. } => Ok(()),
    }
}
