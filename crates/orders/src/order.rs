use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermill_core::{CustomerId, DomainError, DomainResult, Entity, LineItemId, Money, OrderId, ProductId};
use ordermill_customers::Customer;
use ordermill_products::Product;

use crate::pricing;

/// Order status lifecycle.
///
/// New orders start (and currently stay) in `Pending`; there is no further
/// status workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
        }
    }
}

/// An order placed by one customer.
///
/// The owning customer reference is required and immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

/// One product entry within an order: the order–product join carrying the
/// ordered quantity.
///
/// Line items are owned by their order: created together, deleted together.
/// The referenced product has an independent lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// 1-based position within the order, fixed at creation. Reads present
    /// lines in this order.
    pub line_no: i32,
    /// Always ≥ 1; a request line without a quantity defaults to 1.
    pub quantity: i64,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &LineItemId {
        &self.id
    }
}

/// One requested line within an [`OrderDraft`], quantity already defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A validated order-creation request, ready for the store to commit.
///
/// Construction is the only way to obtain one, so holding an `OrderDraft`
/// means: at least one line, every quantity ≥ 1, no product listed twice.
/// Whether the referenced customer and products exist is the store's check,
/// made inside the same transaction that writes the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    customer_id: CustomerId,
    lines: Vec<DraftLine>,
}

impl OrderDraft {
    /// Validate raw request lines. `quantity` of `None` defaults to 1.
    ///
    /// Duplicate product ids are rejected rather than merged, so the
    /// one-line-per-product invariant is deterministic.
    pub fn new(
        customer_id: CustomerId,
        lines: Vec<(ProductId, Option<i64>)>,
    ) -> DomainResult<Self> {
        let mut errors = Vec::new();

        if lines.is_empty() {
            errors.push("products must contain at least one line".to_string());
        }

        let mut seen: Vec<ProductId> = Vec::with_capacity(lines.len());
        let mut drafted = Vec::with_capacity(lines.len());
        for (product_id, quantity) in lines {
            let quantity = quantity.unwrap_or(1);
            if quantity < 1 {
                errors.push(format!(
                    "qty for product {product_id} must be a positive integer"
                ));
            }
            if seen.contains(&product_id) {
                errors.push(format!("duplicate product {product_id}"));
            } else {
                seen.push(product_id);
            }
            drafted.push(DraftLine {
                product_id,
                quantity,
            });
        }

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        Ok(Self {
            customer_id,
            lines: drafted,
        })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    /// Distinct requested product ids, in request order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|line| line.product_id).collect()
    }
}

/// One resolved line on a loaded order: the product joined with its
/// ordered quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDetail {
    pub line_id: LineItemId,
    pub product: Product,
    pub quantity: i64,
}

/// A fully resolved order: base fields plus eager-fetched customer and
/// priced lines.
///
/// This is what read paths hand to the boundary; the total is derived on
/// demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub customer: Customer,
    pub lines: Vec<LineDetail>,
}

impl OrderDetails {
    /// Total price of the order at current product prices.
    pub fn total(&self) -> Money {
        pricing::order_total(&self.lines)
    }
}
