use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ordermill_core::DomainError;
use ordermill_store::StoreError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(details) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "message": "one or more fields are invalid",
                "details": details,
            })),
        )
            .into_response(),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        StoreError::ConstraintViolation(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Transaction(msg) => {
            tracing::error!(error = %msg, "order creation rolled back");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "transaction_failed",
                msg,
            )
        }
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "store backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
