use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult, ProductId};

use crate::discount::ProductDiscount;

/// Catalog view of a product as the pricing engine needs it.
///
/// Owned by the product catalog collaborator; the procurement core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub name: String,
    pub base_price: Decimal,
    /// Percent, e.g. `20` for 20%. `None` when the catalog has no rate.
    pub tax_rate: Option<Decimal>,
    pub is_active: bool,
    pub discounts: Vec<ProductDiscount>,
}

impl CatalogProduct {
    pub fn new(product_id: ProductId, name: impl Into<String>, base_price: Decimal) -> Self {
        Self {
            product_id,
            name: name.into(),
            base_price,
            tax_rate: None,
            is_active: true,
            discounts: Vec::new(),
        }
    }

    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = Some(rate);
        self
    }

    pub fn with_discount(mut self, discount: ProductDiscount) -> Self {
        self.discounts.push(discount);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.base_price < Decimal::ZERO {
            return Err(DomainError::validation("base_price must not be negative"));
        }
        if self.tax_rate.is_some_and(|rate| rate < Decimal::ZERO) {
            return Err(DomainError::validation("tax_rate must not be negative"));
        }
        for discount in &self.discounts {
            discount.validate()?;
        }
        Ok(())
    }
}
