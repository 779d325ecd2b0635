use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordermill_core::{DomainError, DomainResult, Entity, Money, ProductId};

/// A product that can appear on orders.
///
/// Products are referenced by line items across many orders; deleting an
/// order never deletes the products on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price at currency precision.
    pub price: Money,
    /// On-hand stock. Informational only: order creation never decrements it.
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

/// Validated input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

impl NewProduct {
    /// Build from raw request fields. Stock is optional and defaults to 0.
    pub fn from_parts(
        name: Option<String>,
        price: Option<Decimal>,
        stock: Option<i64>,
    ) -> DomainResult<Self> {
        let mut errors = Vec::new();

        let name = name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if name.is_none() {
            errors.push("name is required".to_string());
        }

        let price = price.map(Money::new);
        match price {
            None => errors.push("price is required".to_string()),
            Some(price) if price.is_negative() => {
                errors.push("price cannot be negative".to_string());
            }
            Some(_) => {}
        }

        let stock = stock.unwrap_or(0);
        if stock < 0 {
            errors.push("stock cannot be negative".to_string());
        }

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        Ok(Self {
            name: name.unwrap_or_default(),
            price: price.unwrap_or(Money::ZERO),
            stock,
        })
    }
}

/// Partial update for a product; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = Vec::new();

        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            errors.push("name cannot be empty".to_string());
        }
        if matches!(self.price, Some(price) if Money::new(price).is_negative()) {
            errors.push("price cannot be negative".to_string());
        }
        if matches!(self.stock, Some(stock) if stock < 0) {
            errors.push("stock cannot be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            product.price = Money::new(price);
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn from_parts_accepts_valid_input_and_defaults_stock() {
        let new = NewProduct::from_parts(Some("Widget".to_string()), Some(dec!(10.00)), None)
            .unwrap();
        assert_eq!(new.name, "Widget");
        assert_eq!(new.price, Money::new(dec!(10.00)));
        assert_eq!(new.stock, 0);
    }

    #[test]
    fn from_parts_requires_name_and_price() {
        let err = NewProduct::from_parts(None, None, Some(3)).unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("name")));
                assert!(errors.iter().any(|e| e.contains("price")));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn from_parts_rejects_negative_price_and_stock() {
        let err = NewProduct::from_parts(
            Some("Widget".to_string()),
            Some(dec!(-1.00)),
            Some(-5),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut product = Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            price: Money::new(dec!(10.00)),
            stock: 5,
            created_at: Utc::now(),
        };

        let patch = ProductPatch {
            name: None,
            price: Some(dec!(12.50)),
            stock: None,
        };
        patch.validate().unwrap();
        patch.apply(&mut product);

        assert_eq!(product.name, "Widget");
        assert_eq!(product.price, Money::new(dec!(12.50)));
        assert_eq!(product.stock, 5);
    }
}
