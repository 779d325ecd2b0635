//! HTTP API application wiring (axum router + service wiring).
//!
//! This folder is structured like:
//! - `services.rs`: store selection and shared handles
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app() -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services().await?);
    Ok(build_router(services))
}

/// Router over externally built services; tests inject an in-memory store
/// here.
pub fn build_router(services: Arc<services::AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
