//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Storage concerns
/// (missing rows, broken constraints, failed transactions) live in the
/// store layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more input fields failed validation.
    ///
    /// Carries one message per offending field so the boundary can surface
    /// them all at once.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The per-field messages, if this is a validation failure.
    pub fn field_errors(&self) -> &[String] {
        match self {
            Self::Validation(errors) => errors,
            Self::InvalidId(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_all_fields() {
        let err = DomainError::Validation(vec![
            "name is required".to_string(),
            "email is required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name is required; email is required"
        );
    }
}
