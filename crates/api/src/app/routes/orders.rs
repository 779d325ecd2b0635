use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use ordermill_core::{CustomerId, DomainError, OrderId, ProductId};
use ordermill_orders::OrderDraft;
use ordermill_store::OrderStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).delete(delete_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let draft = match draft_from_request(body) {
        Ok(draft) => draft,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().create_order(draft).await {
        Ok(details) => (StatusCode::CREATED, Json(dto::order_to_json(&details))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Turn the wire shape `{customerId, products: [{id, qty}]}` into a
/// validated [`OrderDraft`].
fn draft_from_request(body: dto::CreateOrderRequest) -> Result<OrderDraft, DomainError> {
    let customer_id: CustomerId = body
        .customer_id
        .ok_or_else(|| DomainError::validation("customerId is required"))?
        .parse()?;

    let mut lines = Vec::new();
    for (index, line) in body.products.unwrap_or_default().into_iter().enumerate() {
        let product_id: ProductId = line
            .id
            .ok_or_else(|| {
                DomainError::validation(format!("products[{index}].id is required"))
            })?
            .parse()?;
        lines.push((product_id, line.qty));
    }

    OrderDraft::new(customer_id, lines)
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_orders().await {
        Ok(orders) => {
            let items: Vec<_> = orders.iter().map(dto::order_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    match services.store().order_details(id).await {
        Ok(details) => (StatusCode::OK, Json(dto::order_to_json(&details))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    match services.store().delete_order(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
