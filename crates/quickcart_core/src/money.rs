//! crates/quickcart_core/src/money.rs
//!
//! Fixed-point currency helpers. Every amount is a `Decimal` carried at two places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places used for every stored and reported amount.
pub const CURRENCY_SCALE: u32 = 2;

/// Rounds to two places, midpoint away from zero, and pins the scale so that
/// `59.9` renders as `59.90`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Largest order total storage accepts (`NUMERIC(20, 2)`).
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 5, false, 2);

pub fn within_order_limit(total: Decimal) -> bool {
    total <= MAX_ORDER_TOTAL
}

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sums line totals and rounds the result once.
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let sum = lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| acc + line_total(price, qty));
    round_currency(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_currency(dec!(10.005)).to_string(), "10.01");
        assert_eq!(round_currency(dec!(10.004)).to_string(), "10.00");
        assert_eq!(round_currency(dec!(59.9)).to_string(), "59.90");
    }

    #[test]
    fn totals_do_not_drift() {
        // 0.1 + 0.2 style drift would show up here with floats.
        let total = order_total(vec![(dec!(0.10), 1), (dec!(0.20), 1)]);
        assert_eq!(total, dec!(0.30));

        let total = order_total(vec![(dec!(29.99), 2)]);
        assert_eq!(total.to_string(), "59.98");

        let many = order_total(std::iter::repeat((dec!(0.01), 1)).take(1000));
        assert_eq!(many, dec!(10.00));
    }

    #[test]
    fn order_limit_matches_storage_precision() {
        assert_eq!(MAX_ORDER_TOTAL, dec!(999999999999999999.99));
        assert!(within_order_limit(dec!(999999999999999999.99)));
        assert!(!within_order_limit(dec!(1000000000000000000.00)));
        assert!(within_order_limit(order_total(vec![(dec!(999.99), 1_000_000)])));
    }
}
