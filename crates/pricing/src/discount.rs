use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};

use crate::money::percent_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage of the base amount.
    Percentage,
    /// `value` is a flat amount in the product currency.
    FixedAmount,
}

impl DiscountType {
    /// Candidate discount on `base` before any clamping.
    pub fn candidate(self, base: Decimal, value: Decimal) -> Decimal {
        match self {
            DiscountType::Percentage => percent_of(base, value),
            DiscountType::FixedAmount => value,
        }
    }
}

/// A time- and quantity-bounded discount attached to a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDiscount {
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// Inclusive lower quantity bound; `None` means unbounded.
    pub min_quantity: Option<i64>,
    /// Inclusive upper quantity bound; `None` means unbounded.
    pub max_quantity: Option<i64>,
    /// First day the discount is active (inclusive).
    pub starts_on: Option<NaiveDate>,
    /// Last day the discount is active (inclusive).
    pub ends_on: Option<NaiveDate>,
    pub is_active: bool,
}

impl ProductDiscount {
    pub fn new(name: impl Into<String>, discount_type: DiscountType, value: Decimal) -> Self {
        Self {
            name: name.into(),
            discount_type,
            value,
            min_quantity: None,
            max_quantity: None,
            starts_on: None,
            ends_on: None,
            is_active: true,
        }
    }

    pub fn with_quantity_bounds(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    pub fn with_active_window(mut self, starts_on: Option<NaiveDate>, ends_on: Option<NaiveDate>) -> Self {
        self.starts_on = starts_on;
        self.ends_on = ends_on;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Reject definitions the engine could never apply sensibly.
    pub fn validate(&self) -> DomainResult<()> {
        if self.value < Decimal::ZERO {
            return Err(DomainError::validation("discount value must not be negative"));
        }
        if self.discount_type == DiscountType::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(
                "percentage discount must not exceed 100",
            ));
        }
        if let (Some(min), Some(max)) = (self.min_quantity, self.max_quantity) {
            if min > max {
                return Err(DomainError::validation(
                    "discount min_quantity must not exceed max_quantity",
                ));
            }
        }
        if let (Some(start), Some(end)) = (self.starts_on, self.ends_on) {
            if start > end {
                return Err(DomainError::validation(
                    "discount start date must not be after end date",
                ));
            }
        }
        Ok(())
    }

    /// Active flag set and, where bounds exist, `today` inside them.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        if self.starts_on.is_some_and(|start| today < start) {
            return false;
        }
        if self.ends_on.is_some_and(|end| today > end) {
            return false;
        }
        true
    }

    pub fn applies_to_quantity(&self, quantity: i64) -> bool {
        self.min_quantity.is_none_or(|min| quantity >= min)
            && self.max_quantity.is_none_or(|max| quantity <= max)
    }

    pub fn candidate_amount(&self, base: Decimal) -> Decimal {
        self.discount_type.candidate(base, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let discount = ProductDiscount::new("spring", DiscountType::Percentage, dec!(10))
            .with_active_window(Some(day(2026, 3, 1)), Some(day(2026, 3, 31)));

        assert!(!discount.is_active_on(day(2026, 2, 28)));
        assert!(discount.is_active_on(day(2026, 3, 1)));
        assert!(discount.is_active_on(day(2026, 3, 31)));
        assert!(!discount.is_active_on(day(2026, 4, 1)));
    }

    #[test]
    fn inactive_flag_wins_over_window() {
        let discount = ProductDiscount::new("off", DiscountType::FixedAmount, dec!(5)).deactivated();
        assert!(!discount.is_active_on(day(2026, 1, 1)));
    }

    #[test]
    fn missing_quantity_bound_is_open_ended() {
        let min_only = ProductDiscount::new("bulk", DiscountType::Percentage, dec!(5))
            .with_quantity_bounds(Some(5), None);
        assert!(!min_only.applies_to_quantity(4));
        assert!(min_only.applies_to_quantity(5));
        assert!(min_only.applies_to_quantity(10_000));

        let max_only = ProductDiscount::new("small", DiscountType::Percentage, dec!(5))
            .with_quantity_bounds(None, Some(3));
        assert!(max_only.applies_to_quantity(1));
        assert!(!max_only.applies_to_quantity(4));
    }

    #[test]
    fn validate_rejects_inverted_bounds_and_overlarge_percentages() {
        let inverted = ProductDiscount::new("x", DiscountType::FixedAmount, dec!(1))
            .with_quantity_bounds(Some(10), Some(2));
        assert!(matches!(inverted.validate(), Err(DomainError::Validation(_))));

        let too_much = ProductDiscount::new("x", DiscountType::Percentage, dec!(120));
        assert!(matches!(too_much.validate(), Err(DomainError::Validation(_))));

        let negative = ProductDiscount::new("x", DiscountType::FixedAmount, dec!(-1));
        assert!(matches!(negative.validate(), Err(DomainError::Validation(_))));

        let backwards = ProductDiscount::new("x", DiscountType::FixedAmount, dec!(1))
            .with_active_window(Some(day(2026, 5, 1)), Some(day(2026, 4, 1)));
        assert!(matches!(backwards.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn candidate_amount_by_type() {
        let pct = ProductDiscount::new("p", DiscountType::Percentage, dec!(15));
        let flat = ProductDiscount::new("f", DiscountType::FixedAmount, dec!(15));
        assert_eq!(pct.candidate_amount(dec!(200)), dec!(30));
        assert_eq!(flat.candidate_amount(dec!(200)), dec!(15));
    }
}
