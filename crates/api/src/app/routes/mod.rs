use axum::Router;

pub mod customers;
pub mod orders;
pub mod products;
pub mod system;

/// The `/api` routing tree.
pub fn router() -> Router {
    Router::new()
        .nest("/customers", customers::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
}
