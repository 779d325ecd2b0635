use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use ordermill_core::CustomerId;
use ordermill_customers::{CustomerPatch, NewCustomer};
use ordermill_store::{CustomerStore, OrderStore};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateCustomerRequest>,
) -> axum::response::Response {
    let new = match NewCustomer::from_parts(body.name, body.email) {
        Ok(new) => new,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store().insert_customer(new).await {
        Ok(customer) => {
            (StatusCode::CREATED, Json(dto::customer_to_json(&customer))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store().list_customers().await {
        Ok(customers) => {
            let items: Vec<_> = customers.iter().map(dto::customer_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    let customer = match services.store().customer(id).await {
        Ok(customer) => customer,
        Err(e) => return errors::store_error_to_response(e),
    };
    // Detail reads embed the customer's orders, composed the same way as
    // the order endpoints.
    match services.store().orders_for_customer(id).await {
        Ok(orders) => (
            StatusCode::OK,
            Json(dto::customer_with_orders_to_json(&customer, &orders)),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCustomerRequest>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    let patch = CustomerPatch {
        name: body.name,
        email: body.email,
    };
    if let Err(e) = patch.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.store().update_customer(id, patch).await {
        Ok(customer) => (StatusCode::OK, Json(dto::customer_to_json(&customer))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid customer id")
        }
    };

    match services.store().delete_customer(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
