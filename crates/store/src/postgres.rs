//! Postgres-backed store implementation.
//!
//! Uniqueness and referential integrity are enforced at the database level
//! and surfaced through the pg error codes:
//!
//! | code  | meaning                    | mapped to             |
//! |-------|----------------------------|-----------------------|
//! | 23505 | unique violation           | `ConstraintViolation` |
//! | 23503 | foreign key violation      | `ConstraintViolation` |
//! | 23514 | check constraint violation | `ConstraintViolation` |
//!
//! Order creation runs inside one transaction: the customer and product
//! existence checks, the order insert, and the line-item inserts commit or
//! roll back together.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use ordermill_core::{CustomerId, LineItemId, Money, OrderId, ProductId};
use ordermill_customers::{Customer, CustomerPatch, NewCustomer};
use ordermill_orders::{LineDetail, Order, OrderDetails, OrderDraft, OrderStatus};
use ordermill_products::{NewProduct, Product, ProductPatch};

use crate::error::{EntityKind, StoreError, StoreResult};
use crate::{CustomerStore, OrderStore, ProductStore};

use async_trait::async_trait;

/// Postgres-backed store.
///
/// Thread-safe: all operations go through the sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Idempotent schema bootstrap, applied by [`PostgresStore::migrate`].
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        price NUMERIC(12, 2) NOT NULL,
        stock BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        customer_id UUID NOT NULL REFERENCES customers(id),
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS order_line_items (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_id UUID NOT NULL REFERENCES products(id),
        line_no INT NOT NULL,
        quantity BIGINT NOT NULL DEFAULT 1 CHECK (quantity >= 1),
        UNIQUE (order_id, product_id),
        UNIQUE (order_id, line_no)
    )",
];

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| StoreError::backend(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Create the four tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    /// Batch-compose details for already-fetched orders.
    ///
    /// One query for the customers, one for the line items joined with
    /// their products — the composition never fans out per order.
    async fn compose_orders(&self, orders: Vec<Order>) -> StoreResult<Vec<OrderDetails>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| (*o.id.as_uuid())).collect();
        let customer_ids: Vec<Uuid> = orders
            .iter()
            .map(|o| *o.customer_id.as_uuid())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let customer_rows = sqlx::query(
            "SELECT id, name, email, created_at FROM customers WHERE id = ANY($1)",
        )
        .bind(&customer_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("compose_orders.customers", e))?;

        let mut customers: HashMap<CustomerId, Customer> = HashMap::new();
        for row in customer_rows {
            let customer: Customer = decode::<CustomerRow>(&row)?.into();
            customers.insert(customer.id, customer);
        }

        let line_rows = sqlx::query(
            r#"
            SELECT
                li.id AS line_id,
                li.order_id,
                li.quantity,
                p.id AS product_id,
                p.name,
                p.price,
                p.stock,
                p.created_at AS product_created_at
            FROM order_line_items li
            JOIN products p ON p.id = li.product_id
            WHERE li.order_id = ANY($1)
            ORDER BY li.line_no ASC
            "#,
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("compose_orders.lines", e))?;

        let mut lines_by_order: HashMap<OrderId, Vec<LineDetail>> = HashMap::new();
        for row in line_rows {
            let line = decode::<LineRow>(&row)?;
            lines_by_order
                .entry(OrderId::from_uuid(line.order_id))
                .or_default()
                .push(line.into());
        }

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let customer = customers.get(&order.customer_id).cloned().ok_or_else(|| {
                StoreError::backend(format!(
                    "order {} references missing customer {}",
                    order.id, order.customer_id
                ))
            })?;
            let lines = lines_by_order.remove(&order.id).unwrap_or_default();
            details.push(OrderDetails {
                order,
                customer,
                lines,
            });
        }
        Ok(details)
    }
}

#[async_trait]
impl CustomerStore for PostgresStore {
    async fn insert_customer(&self, new: NewCustomer) -> StoreResult<Customer> {
        let customer = Customer {
            id: CustomerId::new(),
            name: new.name,
            email: new.email,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO customers (id, name, email, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;

        Ok(customer)
    }

    async fn customer(&self, id: CustomerId) -> StoreResult<Customer> {
        let row = sqlx::query("SELECT id, name, email, created_at FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customer", e))?
            .ok_or_else(|| StoreError::not_found(EntityKind::Customer, id))?;

        Ok(decode::<CustomerRow>(&row)?.into())
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, name, email, created_at FROM customers ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_customers", e))?;

        rows.iter()
            .map(|row| Ok(decode::<CustomerRow>(row)?.into()))
            .collect()
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
    ) -> StoreResult<Customer> {
        let row = sqlx::query(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name), email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.email.as_deref().map(str::trim))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_customer", e))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Customer, id))?;

        Ok(decode::<CustomerRow>(&row)?.into())
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Customer, id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product> {
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            price: new.price,
            stock: new.stock,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO products (id, name, price, stock, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.stock)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        Ok(product)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Product> {
        let row =
            sqlx::query("SELECT id, name, price, stock, created_at FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("product", e))?
                .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))?;

        Ok(decode::<ProductRow>(&row)?.into())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, price, stock, created_at FROM products ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|row| Ok(decode::<ProductRow>(row)?.into()))
            .collect()
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                price = COALESCE($3, price),
                stock = COALESCE($4, stock)
            WHERE id = $1
            RETURNING id, name, price, stock, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.price)
        .bind(patch.stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))?;

        Ok(decode::<ProductRow>(&row)?.into())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Product, id));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(
        skip(self, draft),
        fields(customer_id = %draft.customer_id(), line_count = draft.lines().len()),
        err
    )]
    async fn create_order(&self, draft: OrderDraft) -> StoreResult<OrderDetails> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_order.begin", e))?;

        // Existence checks come first, inside the same transaction as the
        // writes, so a concurrent delete cannot leave a dangling order.
        let customer_exists = sqlx::query("SELECT id FROM customers WHERE id = $1")
            .bind(draft.customer_id().as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_order.customer", e))?
            .is_some();
        if !customer_exists {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("create_order.rollback", e))?;
            return Err(StoreError::not_found(
                EntityKind::Customer,
                draft.customer_id(),
            ));
        }

        let requested: Vec<Uuid> = draft
            .product_ids()
            .into_iter()
            .map(|id| *id.as_uuid())
            .collect();
        let found_rows = sqlx::query("SELECT id FROM products WHERE id = ANY($1)")
            .bind(&requested)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("create_order.products", e))?;
        let found: HashSet<Uuid> = found_rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| StoreError::backend(format!("failed to decode product id: {e}")))?;

        let missing: Vec<String> = requested
            .iter()
            .filter(|id| !found.contains(*id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("create_order.rollback", e))?;
            return Err(StoreError::missing(EntityKind::Product, missing));
        }

        let order = Order {
            id: OrderId::new(),
            customer_id: draft.customer_id(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| as_transaction_failure(map_sqlx_error("create_order.order", e)))?;

        for (index, line) in draft.lines().iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_line_items (id, order_id, product_id, line_no, quantity) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(LineItemId::new().as_uuid())
            .bind(order.id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind((index as i32) + 1)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| as_transaction_failure(map_sqlx_error("create_order.line", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(format!("commit failed: {e}")))?;

        self.order_details(order.id).await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order_details(&self, id: OrderId) -> StoreResult<OrderDetails> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_details", e))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Order, id))?;

        let order = decode::<OrderRow>(&row)?.into_order()?;
        let mut composed = self.compose_orders(vec![order]).await?;
        composed
            .pop()
            .ok_or_else(|| StoreError::backend("order vanished during composition"))
    }

    async fn list_orders(&self) -> StoreResult<Vec<OrderDetails>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, status, created_at FROM orders ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let orders = rows
            .iter()
            .map(|row| decode::<OrderRow>(row)?.into_order())
            .collect::<StoreResult<Vec<Order>>>()?;
        self.compose_orders(orders).await
    }

    async fn orders_for_customer(&self, id: CustomerId) -> StoreResult<Vec<OrderDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, status, created_at
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_for_customer", e))?;

        let orders = rows
            .iter()
            .map(|row| decode::<OrderRow>(row)?.into_order())
            .collect::<StoreResult<Vec<Order>>>()?;
        self.compose_orders(orders).await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        // Line items go with the order via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }
        Ok(())
    }
}

/// Map sqlx errors onto the store taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => {
                    StoreError::ConstraintViolation(msg)
                }
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

/// Inside an atomic write, backend failures mean the whole operation rolled
/// back; constraint reports keep their meaning.
fn as_transaction_failure(err: StoreError) -> StoreError {
    match err {
        StoreError::Backend(msg) => StoreError::Transaction(msg),
        other => other,
    }
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> StoreResult<T> {
    T::from_row(row).map_err(|e| StoreError::backend(format!("failed to decode row: {e}")))
}

// sqlx row types

#[derive(Debug)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CustomerRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CustomerRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: CustomerId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    stock: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            price: Money::new(row.price),
            stock: row.stock,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl OrderRow {
    fn into_order(self) -> StoreResult<Order> {
        let status = match self.status.as_str() {
            "pending" => OrderStatus::Pending,
            other => {
                return Err(StoreError::backend(format!(
                    "unknown order status '{other}' for order {}",
                    self.id
                )));
            }
        };
        Ok(Order {
            id: OrderId::from_uuid(self.id),
            customer_id: CustomerId::from_uuid(self.customer_id),
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct LineRow {
    line_id: Uuid,
    order_id: Uuid,
    quantity: i64,
    product_id: Uuid,
    name: String,
    price: Decimal,
    stock: i64,
    product_created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineRow {
            line_id: row.try_get("line_id")?,
            order_id: row.try_get("order_id")?,
            quantity: row.try_get("quantity")?,
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            product_created_at: row.try_get("product_created_at")?,
        })
    }
}

impl From<LineRow> for LineDetail {
    fn from(row: LineRow) -> Self {
        LineDetail {
            line_id: LineItemId::from_uuid(row.line_id),
            product: Product {
                id: ProductId::from_uuid(row.product_id),
                name: row.name,
                price: Money::new(row.price),
                stock: row.stock,
                created_at: row.product_created_at,
            },
            quantity: row.quantity,
        }
    }
}
