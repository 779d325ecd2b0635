use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use ordermill_core::{CustomerId, LineItemId, OrderId, ProductId};
use ordermill_customers::{Customer, CustomerPatch, NewCustomer};
use ordermill_orders::{LineDetail, LineItem, Order, OrderDetails, OrderDraft, OrderStatus};
use ordermill_products::{NewProduct, Product, ProductPatch};

use crate::error::{EntityKind, StoreError, StoreResult};
use crate::{CustomerStore, OrderStore, ProductStore};

/// In-memory store backed by one table set behind a single `RwLock`.
///
/// Intended for tests/dev. A write guard spans every multi-record mutation,
/// which makes order creation and deletion atomic by construction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    line_items: Vec<LineItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

impl Tables {
    /// Eager composition: order + customer + lines joined with products.
    fn compose(&self, order: &Order) -> StoreResult<OrderDetails> {
        let customer = self
            .customers
            .get(&order.customer_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::backend(format!(
                    "order {} references missing customer {}",
                    order.id, order.customer_id
                ))
            })?;

        let mut lines: Vec<&LineItem> = self
            .line_items
            .iter()
            .filter(|item| item.order_id == order.id)
            .collect();
        lines.sort_by_key(|item| item.line_no);

        let mut details = Vec::with_capacity(lines.len());
        for item in lines {
            let product = self.products.get(&item.product_id).cloned().ok_or_else(|| {
                StoreError::backend(format!(
                    "line item {} references missing product {}",
                    item.id, item.product_id
                ))
            })?;
            details.push(LineDetail {
                line_id: item.id,
                product,
                quantity: item.quantity,
            });
        }

        Ok(OrderDetails {
            order: order.clone(),
            customer,
            lines: details,
        })
    }

    fn compose_all<'a, I>(&self, orders: I) -> StoreResult<Vec<OrderDetails>>
    where
        I: Iterator<Item = &'a Order>,
    {
        let mut sorted: Vec<&Order> = orders.collect();
        sorted.sort_by_key(|order| order.id);
        sorted.into_iter().map(|order| self.compose(order)).collect()
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(&self, new: NewCustomer) -> StoreResult<Customer> {
        let mut tables = self.write()?;

        if tables.customers.values().any(|c| c.email == new.email) {
            return Err(StoreError::conflict(format!(
                "customer email already exists: {}",
                new.email
            )));
        }

        let customer = Customer {
            id: CustomerId::new(),
            name: new.name,
            email: new.email,
            created_at: Utc::now(),
        };
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn customer(&self, id: CustomerId) -> StoreResult<Customer> {
        self.read()?
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Customer, id))
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let tables = self.read()?;
        let mut customers: Vec<Customer> = tables.customers.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        Ok(customers)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        patch: CustomerPatch,
    ) -> StoreResult<Customer> {
        let mut tables = self.write()?;

        if let Some(email) = &patch.email {
            let email = email.trim();
            if tables
                .customers
                .values()
                .any(|c| c.id != id && c.email == email)
            {
                return Err(StoreError::conflict(format!(
                    "customer email already exists: {email}"
                )));
            }
        }

        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Customer, id))?;
        patch.apply(customer);
        Ok(customer.clone())
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<()> {
        let mut tables = self.write()?;

        if !tables.customers.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Customer, id));
        }
        if tables.orders.values().any(|o| o.customer_id == id) {
            return Err(StoreError::conflict(format!(
                "customer {id} still has orders"
            )));
        }

        tables.customers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, new: NewProduct) -> StoreResult<Product> {
        let mut tables = self.write()?;
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            price: new.price,
            stock: new.stock,
            created_at: Utc::now(),
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut tables = self.write()?;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Product, id))?;
        patch.apply(product);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.write()?;

        if !tables.products.contains_key(&id) {
            return Err(StoreError::not_found(EntityKind::Product, id));
        }
        if tables.line_items.iter().any(|item| item.product_id == id) {
            return Err(StoreError::conflict(format!(
                "product {id} is still referenced by orders"
            )));
        }

        tables.products.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, draft: OrderDraft) -> StoreResult<OrderDetails> {
        let mut tables = self.write()?;

        // Resolve-then-mutate: both existence checks precede any insert,
        // and the write guard makes the whole block atomic.
        if !tables.customers.contains_key(&draft.customer_id()) {
            return Err(StoreError::not_found(
                EntityKind::Customer,
                draft.customer_id(),
            ));
        }

        let missing: Vec<String> = draft
            .product_ids()
            .into_iter()
            .filter(|id| !tables.products.contains_key(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::missing(EntityKind::Product, missing));
        }

        let order = Order {
            id: OrderId::new(),
            customer_id: draft.customer_id(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        tables.orders.insert(order.id, order.clone());

        for (index, line) in draft.lines().iter().enumerate() {
            tables.line_items.push(LineItem {
                id: LineItemId::new(),
                order_id: order.id,
                product_id: line.product_id,
                line_no: (index as i32) + 1,
                quantity: line.quantity,
            });
        }

        tables.compose(&order)
    }

    async fn order_details(&self, id: OrderId) -> StoreResult<OrderDetails> {
        let tables = self.read()?;
        let order = tables
            .orders
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Order, id))?;
        tables.compose(order)
    }

    async fn list_orders(&self) -> StoreResult<Vec<OrderDetails>> {
        let tables = self.read()?;
        tables.compose_all(tables.orders.values())
    }

    async fn orders_for_customer(&self, id: CustomerId) -> StoreResult<Vec<OrderDetails>> {
        let tables = self.read()?;
        tables.compose_all(tables.orders.values().filter(|o| o.customer_id == id))
    }

    async fn delete_order(&self, id: OrderId) -> StoreResult<()> {
        let mut tables = self.write()?;

        if tables.orders.remove(&id).is_none() {
            return Err(StoreError::not_found(EntityKind::Order, id));
        }
        // Line items are owned by the order and go with it.
        tables.line_items.retain(|item| item.order_id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordermill_core::Money;
    use rust_decimal_macros::dec;

    async fn seed_customer(store: &MemoryStore, name: &str, email: &str) -> Customer {
        store
            .insert_customer(
                NewCustomer::from_parts(Some(name.to_string()), Some(email.to_string())).unwrap(),
            )
            .await
            .unwrap()
    }

    async fn seed_product(store: &MemoryStore, name: &str, price: &str) -> Product {
        store
            .insert_product(
                NewProduct::from_parts(
                    Some(name.to_string()),
                    Some(price.parse().unwrap()),
                    Some(10),
                )
                .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_order_builds_one_line_per_product() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;
        let gadget = seed_product(&store, "Gadget", "5.50").await;

        let draft = OrderDraft::new(
            ann.id,
            vec![(widget.id, Some(2)), (gadget.id, None)],
        )
        .unwrap();
        let details = store.create_order(draft).await.unwrap();

        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.customer.id, ann.id);
        assert_eq!(details.lines.len(), 2);
        assert_eq!(details.lines[0].product.id, widget.id);
        assert_eq!(details.lines[0].quantity, 2);
        assert_eq!(details.lines[1].product.id, gadget.id);
        assert_eq!(details.lines[1].quantity, 1);
        assert_eq!(details.total(), Money::new(dec!(25.50)));
    }

    #[tokio::test]
    async fn create_order_with_unknown_customer_writes_nothing() {
        let store = MemoryStore::new();
        let widget = seed_product(&store, "Widget", "10.00").await;

        let ghost = CustomerId::new();
        let draft = OrderDraft::new(ghost, vec![(widget.id, Some(1))]).unwrap();
        let err = store.create_order(draft).await.unwrap_err();

        match err {
            StoreError::NotFound { entity, ids } => {
                assert_eq!(entity, EntityKind::Customer);
                assert_eq!(ids, vec![ghost.to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_order_with_any_unknown_product_writes_nothing() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;

        let ghost = ProductId::new();
        let draft = OrderDraft::new(
            ann.id,
            vec![(widget.id, Some(1)), (ghost, Some(1))],
        )
        .unwrap();
        let err = store.create_order(draft).await.unwrap_err();

        match err {
            StoreError::NotFound { entity, ids } => {
                assert_eq!(entity, EntityKind::Product);
                assert_eq!(ids, vec![ghost.to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(store.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_customer_email_is_a_conflict() {
        let store = MemoryStore::new();
        seed_customer(&store, "Ann", "ann@x.com").await;

        let err = store
            .insert_customer(
                NewCustomer::from_parts(
                    Some("Other Ann".to_string()),
                    Some("ann@x.com".to_string()),
                )
                .unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn update_cannot_steal_anothers_email() {
        let store = MemoryStore::new();
        seed_customer(&store, "Ann", "ann@x.com").await;
        let bob = seed_customer(&store, "Bob", "bob@x.com").await;

        let patch = CustomerPatch {
            name: None,
            email: Some("ann@x.com".to_string()),
        };
        let err = store.update_customer(bob.id, patch).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn delete_order_removes_lines_but_keeps_references() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;

        let draft = OrderDraft::new(ann.id, vec![(widget.id, Some(2))]).unwrap();
        let details = store.create_order(draft).await.unwrap();

        store.delete_order(details.order.id).await.unwrap();

        let err = store.order_details(details.order.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: EntityKind::Order, .. }));
        // Referenced entities survive, and the product is deletable again.
        assert_eq!(store.customer(ann.id).await.unwrap().id, ann.id);
        assert_eq!(store.product(widget.id).await.unwrap().id, widget.id);
        store.delete_product(widget.id).await.unwrap();
    }

    #[tokio::test]
    async fn referenced_customer_and_product_cannot_be_deleted() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;

        let draft = OrderDraft::new(ann.id, vec![(widget.id, None)]).unwrap();
        store.create_order(draft).await.unwrap();

        assert!(matches!(
            store.delete_customer(ann.id).await.unwrap_err(),
            StoreError::ConstraintViolation(_)
        ));
        assert!(matches!(
            store.delete_product(widget.id).await.unwrap_err(),
            StoreError::ConstraintViolation(_)
        ));
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;
        let gadget = seed_product(&store, "Gadget", "5.50").await;

        let draft = OrderDraft::new(
            ann.id,
            vec![(widget.id, Some(2)), (gadget.id, Some(1))],
        )
        .unwrap();
        let created = store.create_order(draft).await.unwrap();

        let first = store.order_details(created.order.id).await.unwrap();
        let second = store.order_details(created.order.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total(), second.total());
    }

    #[tokio::test]
    async fn orders_for_customer_filters_by_owner() {
        let store = MemoryStore::new();
        let ann = seed_customer(&store, "Ann", "ann@x.com").await;
        let bob = seed_customer(&store, "Bob", "bob@x.com").await;
        let widget = seed_product(&store, "Widget", "10.00").await;

        store
            .create_order(OrderDraft::new(ann.id, vec![(widget.id, None)]).unwrap())
            .await
            .unwrap();
        store
            .create_order(OrderDraft::new(bob.id, vec![(widget.id, Some(3))]).unwrap())
            .await
            .unwrap();

        let anns = store.orders_for_customer(ann.id).await.unwrap();
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].order.customer_id, ann.id);
        assert_eq!(store.list_orders().await.unwrap().len(), 2);
    }
}
