use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermill_core::{CustomerId, DomainError, DomainResult, Entity};

/// A customer who places orders.
///
/// Customers are referenced by orders, never owned by them: deleting an
/// order leaves its customer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Unique across the store.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &CustomerId {
        &self.id
    }
}

/// Validated input for registering a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
}

impl NewCustomer {
    /// Build from raw request fields, collecting one message per offending
    /// field.
    pub fn from_parts(name: Option<String>, email: Option<String>) -> DomainResult<Self> {
        let mut errors = Vec::new();

        let name = non_empty(name);
        if name.is_none() {
            errors.push("name is required".to_string());
        }

        let email = non_empty(email);
        match &email {
            None => errors.push("email is required".to_string()),
            Some(email) if !email.contains('@') => {
                errors.push("email must be a valid address".to_string());
            }
            Some(_) => {}
        }

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        Ok(Self {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
        })
    }
}

/// Partial update for a customer; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    /// Reject patches whose present fields are unusable.
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = Vec::new();

        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            errors.push("name cannot be empty".to_string());
        }
        match &self.email {
            Some(email) if email.trim().is_empty() => {
                errors.push("email cannot be empty".to_string());
            }
            Some(email) if !email.contains('@') => {
                errors.push("email must be a valid address".to_string());
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    pub fn apply(&self, customer: &mut Customer) {
        if let Some(name) = &self.name {
            customer.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            customer.email = email.trim().to_string();
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_accepts_valid_input() {
        let new = NewCustomer::from_parts(
            Some("Ann".to_string()),
            Some("ann@x.com".to_string()),
        )
        .unwrap();
        assert_eq!(new.name, "Ann");
        assert_eq!(new.email, "ann@x.com");
    }

    #[test]
    fn from_parts_collects_all_missing_fields() {
        let err = NewCustomer::from_parts(None, None).unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().any(|e| e.contains("name")));
                assert!(errors.iter().any(|e| e.contains("email")));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn from_parts_rejects_blank_and_invalid_email() {
        assert!(NewCustomer::from_parts(Some("Ann".to_string()), Some("   ".to_string())).is_err());
        assert!(
            NewCustomer::from_parts(Some("Ann".to_string()), Some("not-an-email".to_string()))
                .is_err()
        );
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut customer = Customer {
            id: CustomerId::new(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            created_at: Utc::now(),
        };

        let patch = CustomerPatch {
            name: Some("Ann Lee".to_string()),
            email: None,
        };
        patch.validate().unwrap();
        patch.apply(&mut customer);

        assert_eq!(customer.name, "Ann Lee");
        assert_eq!(customer.email, "ann@x.com");
    }

    #[test]
    fn patch_rejects_blank_fields() {
        let patch = CustomerPatch {
            name: Some("  ".to_string()),
            email: Some("nope".to_string()),
        };
        let err = patch.validate().unwrap_err();
        match err {
            DomainError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
