//! `ordermill-store` — durable storage for customers, products, and orders.
//!
//! One trait surface, two backends:
//! - [`MemoryStore`]: lock-guarded tables for tests and dev.
//! - [`PostgresStore`]: sqlx-backed, transactions for the multi-record
//!   paths, schema bootstrap via [`PostgresStore::migrate`].
//!
//! The order operations carry the consistency contract of the system:
//! [`OrderStore::create_order`] checks the referenced customer and the full
//! product set *before* writing anything and commits the order with its
//! line items atomically, and the read operations eager-fetch customer and
//! products-with-quantity so callers never fan out into per-line lookups.

pub mod error;
pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use ordermill_core::{CustomerId, OrderId, ProductId};
use ordermill_customers::{Customer, CustomerPatch, NewCustomer};
use ordermill_orders::{OrderDetails, OrderDraft};
use ordermill_products::{NewProduct, Product, ProductPatch};

pub use error::{EntityKind, StoreError, StoreResult};
pub use in_memory::MemoryStore;
pub use postgres::PostgresStore;

/// CRUD primitives for customers.
///
/// `insert_customer` enforces email uniqueness (`ConstraintViolation` on a
/// duplicate); identity lookups fail with `NotFound` when they miss.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert_customer(&self, new: NewCustomer) -> StoreResult<Customer>;
    async fn customer(&self, id: CustomerId) -> StoreResult<Customer>;
    async fn list_customers(&self) -> StoreResult<Vec<Customer>>;
    async fn update_customer(&self, id: CustomerId, patch: CustomerPatch)
        -> StoreResult<Customer>;
    /// Fails with `ConstraintViolation` while the customer still has orders.
    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()>;
}

/// CRUD primitives for products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn product(&self, id: ProductId) -> StoreResult<Product>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;
    /// Fails with `ConstraintViolation` while the product is on any order.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;
}

/// Order aggregation and eager-fetched order reads.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically create an order with its line items.
    ///
    /// Validation order is fixed: the customer is resolved first
    /// (`NotFound{customer}`), then the whole product set in one batch
    /// (`NotFound{product, ids: the missing ones}`). Only when both checks
    /// pass are the order and its line items written, and they commit or
    /// roll back together; a partial order is never observable.
    ///
    /// Returns the new order re-fetched with its associations.
    async fn create_order(&self, draft: OrderDraft) -> StoreResult<OrderDetails>;

    /// One order with its customer and products-with-quantity resolved.
    async fn order_details(&self, id: OrderId) -> StoreResult<OrderDetails>;

    /// Every order, each with associations resolved (no per-order fan-out).
    async fn list_orders(&self) -> StoreResult<Vec<OrderDetails>>;

    /// The given customer's orders, associations resolved.
    async fn orders_for_customer(&self, id: CustomerId) -> StoreResult<Vec<OrderDetails>>;

    /// Delete an order and its line items; referenced products and the
    /// customer are left intact.
    async fn delete_order(&self, id: OrderId) -> StoreResult<()>;
}

/// The full store surface a backend provides.
pub trait Store: CustomerStore + ProductStore + OrderStore {}

impl<S: CustomerStore + ProductStore + OrderStore> Store for S {}
