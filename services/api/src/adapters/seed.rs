//! services/api/src/adapters/seed.rs
//!
//! Sample catalog used to populate an empty store at startup.

use quickcart_core::domain::NewProduct;
use quickcart_core::ports::{DatabaseService, PortResult};
use rust_decimal::Decimal;
use tracing::info;

fn product(
    name: &str,
    description: &str,
    cents: i64,
    category: &str,
    image_url: &str,
    stock_quantity: i32,
) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: Some(description.to_string()),
        price: Decimal::new(cents, 2),
        category: Some(category.to_string()),
        image_url: Some(image_url.to_string()),
        stock_quantity,
    }
}

pub fn sample_products() -> Vec<NewProduct> {
    vec![
        product(
            "Wireless Bluetooth Headphones",
            "High-quality wireless headphones with noise cancellation",
            9999,
            "electronics",
            "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=500",
            25,
        ),
        product(
            "Smartphone Case",
            "Protective case for smartphones with drop protection",
            2499,
            "electronics",
            "https://images.unsplash.com/photo-1556656793-08538906a9f8?w=500",
            50,
        ),
        product(
            "Coffee Mug",
            "Ceramic coffee mug with ergonomic handle",
            1299,
            "home",
            "https://images.unsplash.com/photo-1514228742587-6b1558fcf93a?w=500",
            30,
        ),
        product(
            "Running Shoes",
            "Comfortable running shoes with excellent cushioning",
            7999,
            "sports",
            "https://images.unsplash.com/photo-1542291026-7eec264c27ff?w=500",
            15,
        ),
        product(
            "Notebook Set",
            "Set of 3 premium notebooks for writing and sketching",
            1899,
            "office",
            "https://images.unsplash.com/photo-1544716278-ca5e3f4abd8c?w=500",
            40,
        ),
    ]
}

/// Inserts the sample catalog when the store has no products. Returns how many
/// products were inserted.
pub async fn seed_if_empty(db: &dyn DatabaseService) -> PortResult<usize> {
    if db.count_products().await? > 0 {
        return Ok(0);
    }
    let products = sample_products();
    let count = products.len();
    for product in products {
        db.insert_product(product).await?;
    }
    info!(count, "Seeded empty catalog with sample products.");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryDb;

    #[tokio::test]
    async fn seeds_only_an_empty_catalog() {
        let db = MemoryDb::new();
        assert_eq!(seed_if_empty(&db).await.expect("seed"), 5);
        assert_eq!(seed_if_empty(&db).await.expect("seed again"), 0);
        assert_eq!(db.count_products().await.expect("count"), 5);
        assert_eq!(
            db.list_categories().await.expect("categories"),
            vec!["electronics", "home", "office", "sports"]
        );
    }
}
