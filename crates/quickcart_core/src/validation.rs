//! crates/quickcart_core/src/validation.rs
//!
//! The cart validator. It checks cart lines against a snapshot of product rows and
//! never touches storage itself, so the same logic serves the pre-flight check and
//! the authoritative re-check inside the checkout transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::{CartLine, Product};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineStatus {
    Valid { unit_price: Decimal },
    ProductNotFound,
    InsufficientStock { available: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineValidation {
    pub product_id: i64,
    pub requested: i32,
    pub status: LineStatus,
}

impl LineValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self.status, LineStatus::Valid { .. })
    }

    /// A client-facing description of what is wrong with the line, if anything.
    pub fn error_message(&self) -> Option<String> {
        match self.status {
            LineStatus::Valid { .. } => None,
            LineStatus::ProductNotFound => Some(format!("Product {} not found", self.product_id)),
            LineStatus::InsufficientStock { available } => {
                Some(format!("Only {} items available", available))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartValidation {
    pub lines: Vec<LineValidation>,
    pub all_valid: bool,
}

impl CartValidation {
    pub fn first_invalid(&self) -> Option<&LineValidation> {
        self.lines.iter().find(|line| !line.is_valid())
    }
}

/// Structural problems with a cart that make it unusable before any lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartShapeError {
    #[error("Cart must contain at least one item")]
    Empty,
    #[error("Quantity for product {product_id} must be positive")]
    NonPositiveQuantity { product_id: i64 },
}

pub fn check_cart_shape(lines: &[CartLine]) -> Result<(), CartShapeError> {
    if lines.is_empty() {
        return Err(CartShapeError::Empty);
    }
    if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
        return Err(CartShapeError::NonPositiveQuantity { product_id: line.product_id });
    }
    Ok(())
}

/// Validates every line against `products`. Lines naming the same product draw on
/// the same stock, so a later line sees what the earlier ones left.
pub fn validate_cart(lines: &[CartLine], products: &[Product]) -> CartValidation {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut claimed: HashMap<i64, i32> = HashMap::new();

    let lines: Vec<LineValidation> = lines
        .iter()
        .map(|line| {
            let status = match by_id.get(&line.product_id) {
                None => LineStatus::ProductNotFound,
                Some(product) => {
                    let already = claimed.get(&product.id).copied().unwrap_or(0);
                    let available = (product.stock_quantity - already).max(0);
                    if line.quantity > available {
                        LineStatus::InsufficientStock { available }
                    } else {
                        claimed.insert(product.id, already + line.quantity);
                        LineStatus::Valid { unit_price: product.price }
                    }
                }
            };
            LineValidation {
                product_id: line.product_id,
                requested: line.quantity,
                status,
            }
        })
        .collect();

    let all_valid = lines.iter().all(LineValidation::is_valid);
    CartValidation { lines, all_valid }
}

/// Distinct product ids in first-seen order.
pub fn referenced_product_ids(lines: &[CartLine]) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::with_capacity(lines.len());
    for line in lines {
        if !ids.contains(&line.product_id) {
            ids.push(line.product_id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product(id: i64, price: Decimal, stock: i32) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            description: None,
            price,
            category: None,
            image_url: None,
            stock_quantity: stock,
            created_at: Utc::now(),
        }
    }

    fn line(product_id: i64, quantity: i32) -> CartLine {
        CartLine { product_id, quantity }
    }

    #[test]
    fn valid_lines_carry_current_price() {
        let products = vec![product(1, dec!(29.99), 10)];
        let result = validate_cart(&[line(1, 2)], &products);
        assert!(result.all_valid);
        assert_eq!(result.lines[0].status, LineStatus::Valid { unit_price: dec!(29.99) });
    }

    #[test]
    fn reports_missing_product_and_short_stock_per_line() {
        let products = vec![product(1, dec!(5.00), 1), product(2, dec!(3.00), 4)];
        let result = validate_cart(&[line(1, 5), line(99, 1), line(2, 4)], &products);

        assert!(!result.all_valid);
        assert_eq!(result.lines[0].status, LineStatus::InsufficientStock { available: 1 });
        assert_eq!(result.lines[0].error_message().as_deref(), Some("Only 1 items available"));
        assert_eq!(result.lines[1].status, LineStatus::ProductNotFound);
        assert!(result.lines[2].is_valid());
        assert_eq!(result.first_invalid().map(|l| l.product_id), Some(1));
    }

    #[test]
    fn repeated_product_shares_stock() {
        let products = vec![product(1, dec!(1.00), 5)];
        let result = validate_cart(&[line(1, 3), line(1, 3)], &products);
        assert!(result.lines[0].is_valid());
        assert_eq!(result.lines[1].status, LineStatus::InsufficientStock { available: 2 });
    }

    #[test]
    fn validation_is_idempotent() {
        let products = vec![product(1, dec!(2.50), 3), product(2, dec!(9.99), 0)];
        let cart = [line(1, 3), line(2, 1)];
        assert_eq!(validate_cart(&cart, &products), validate_cart(&cart, &products));
        assert_eq!(products[0].stock_quantity, 3);
    }

    #[test]
    fn shape_check_rejects_empty_and_non_positive() {
        assert_eq!(check_cart_shape(&[]), Err(CartShapeError::Empty));
        assert_eq!(
            check_cart_shape(&[line(1, 1), line(2, 0)]),
            Err(CartShapeError::NonPositiveQuantity { product_id: 2 })
        );
        assert!(check_cart_shape(&[line(1, 1)]).is_ok());
    }

    #[test]
    fn referenced_ids_are_deduplicated_in_order() {
        assert_eq!(referenced_product_ids(&[line(3, 1), line(1, 1), line(3, 2)]), vec![3, 1]);
    }
}
