use core::fmt;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What kind of entity a store lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Customer,
    Product,
    Order,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Product => "product",
            EntityKind::Order => "order",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store operation error.
///
/// These are storage-boundary failures, as opposed to domain input errors
/// (`ordermill_core::DomainError`). The HTTP layer maps them onto status
/// codes: `NotFound` → 404, `ConstraintViolation` → 409, the rest → 500.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An identity lookup missed; `ids` names exactly what was asked for
    /// and not found.
    #[error("{entity} not found: {}", .ids.join(", "))]
    NotFound { entity: EntityKind, ids: Vec<String> },

    /// A uniqueness or referential rule was broken (e.g. duplicate customer
    /// email, deleting a product that is still on orders).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// An atomic write failed and was rolled back; no partial records
    /// remain.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// Backend failure (connection, decoding, lock poisoning).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            ids: vec![id.to_string()],
        }
    }

    pub fn missing(entity: EntityKind, ids: Vec<String>) -> Self {
        Self::NotFound { entity, ids }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
