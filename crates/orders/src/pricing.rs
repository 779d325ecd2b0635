//! Line-item pricing: deriving an order's total from its resolved lines.
//!
//! The total is a pure function of the loaded order: unit price times
//! quantity, summed, rounded half-up to currency precision. It is computed
//! on every read and never stored, so it always reflects current product
//! prices.

use ordermill_core::Money;

use crate::order::LineDetail;

/// Quantity assumed for a line whose stored quantity is unusable.
///
/// Stored line items always carry an explicit quantity ≥ 1, so this is a
/// degenerate fallback, not the common path.
const DEFAULT_QUANTITY: i64 = 1;

/// Sum of unit price × quantity across the lines, rounded half-up to two
/// decimal places.
pub fn order_total(lines: &[LineDetail]) -> Money {
    lines
        .iter()
        .map(|line| line.product.price.times(effective_quantity(line)))
        .sum::<Money>()
        .rounded()
}

fn effective_quantity(line: &LineDetail) -> i64 {
    if line.quantity >= 1 {
        line.quantity
    } else {
        DEFAULT_QUANTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ordermill_core::{LineItemId, ProductId};
    use ordermill_products::Product;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i64) -> LineDetail {
        LineDetail {
            line_id: LineItemId::new(),
            product: Product {
                id: ProductId::new(),
                name: "test product".to_string(),
                price: Money::new(price),
                stock: 0,
                created_at: Utc::now(),
            },
            quantity,
        }
    }

    #[test]
    fn sums_price_times_quantity() {
        let lines = vec![line(dec!(10.00), 2), line(dec!(5.50), 1)];
        assert_eq!(order_total(&lines).to_string(), "25.50");
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(order_total(&[]).to_string(), "0.00");
    }

    #[test]
    fn rounds_half_up_at_two_decimals() {
        // 3 × 6.665 = 19.995, which must round up.
        let lines = vec![line(dec!(6.665), 3)];
        assert_eq!(order_total(&lines).to_string(), "20.00");
    }

    #[test]
    fn unusable_quantity_falls_back_to_one() {
        let lines = vec![line(dec!(4.00), 0)];
        assert_eq!(order_total(&lines).to_string(), "4.00");
    }

    #[test]
    fn recomputation_is_stable() {
        let lines = vec![line(dec!(10.00), 2), line(dec!(5.50), 1)];
        assert_eq!(order_total(&lines), order_total(&lines));
    }

    proptest! {
        #[test]
        fn total_does_not_depend_on_line_order(
            cents_and_qty in proptest::collection::vec((0u32..1_000_000u32, 1i64..100i64), 1..8)
        ) {
            let lines: Vec<LineDetail> = cents_and_qty
                .iter()
                .map(|&(cents, qty)| line(Decimal::new(i64::from(cents), 2), qty))
                .collect();
            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(order_total(&lines), order_total(&reversed));
        }
    }
}
