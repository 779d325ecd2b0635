//! `ordermill-orders` — orders, line items, and line-item pricing.
//!
//! The order side of the domain: the [`Order`] and [`LineItem`] entities,
//! the validated creation input ([`OrderDraft`]), the composed read view
//! ([`OrderDetails`]), and the total calculator ([`pricing::order_total`]).

pub mod order;
pub mod pricing;

pub use order::{
    DraftLine, LineDetail, LineItem, Order, OrderDetails, OrderDraft, OrderStatus,
};
