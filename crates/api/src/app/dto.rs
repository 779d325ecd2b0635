use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use ordermill_customers::Customer;
use ordermill_orders::{LineDetail, OrderDetails};
use ordermill_products::Product;

// -------------------------
// Request DTOs
// -------------------------
//
// Fields are optional at the wire level; presence and shape are checked by
// the domain `from_parts`/patch validators so a single 400 can report every
// missing field at once.

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub products: Option<Vec<OrderLineRequest>>,
}

/// One `{id, qty}` entry in an order-creation request; `qty` defaults to 1.
#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub id: Option<String>,
    pub qty: Option<i64>,
}

// -------------------------
// Response JSON mapping
// -------------------------

pub fn customer_to_json(customer: &Customer) -> Value {
    json!({
        "id": customer.id.to_string(),
        "name": customer.name,
        "email": customer.email,
        "createdAt": customer.created_at.to_rfc3339(),
    })
}

/// Customer detail shape: the customer plus their orders, each composed the
/// same way as the order endpoints.
pub fn customer_with_orders_to_json(customer: &Customer, orders: &[OrderDetails]) -> Value {
    let mut value = customer_to_json(customer);
    value["orders"] = Value::Array(orders.iter().map(order_to_json).collect());
    value
}

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "id": product.id.to_string(),
        "name": product.name,
        "price": product.price,
        "stock": product.stock,
        "createdAt": product.created_at.to_rfc3339(),
    })
}

/// The externally visible order shape: base fields, nested customer, nested
/// products-with-quantity, and the derived total.
pub fn order_to_json(details: &OrderDetails) -> Value {
    json!({
        "id": details.order.id.to_string(),
        "customerId": details.order.customer_id.to_string(),
        "status": details.order.status,
        "createdAt": details.order.created_at.to_rfc3339(),
        "customer": customer_to_json(&details.customer),
        "products": details.lines.iter().map(line_to_json).collect::<Vec<_>>(),
        "total": details.total(),
    })
}

fn line_to_json(line: &LineDetail) -> Value {
    let mut value = product_to_json(&line.product);
    value["quantity"] = json!(line.quantity);
    value
}
