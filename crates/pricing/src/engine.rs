use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogProduct;
use crate::discount::{DiscountType, ProductDiscount};
use crate::money::{percent_of, round_currency};

/// Result of pricing one unit of a product at a given quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub tax_amount: Decimal,
    pub total_price: Decimal,
    pub applied_discount: Option<ProductDiscount>,
}

/// Effective unit price for `quantity` units of `product` on `today`.
///
/// Best discount wins: of the discounts active today whose quantity bounds
/// admit `quantity`, the one with the largest candidate amount is applied
/// (first one on ties). Discounts never stack.
pub fn effective_price(product: &CatalogProduct, quantity: i64, today: NaiveDate) -> PriceBreakdown {
    let base_price = product.base_price;

    let mut best: Option<(&ProductDiscount, Decimal)> = None;
    for discount in &product.discounts {
        if !discount.is_active_on(today) || !discount.applies_to_quantity(quantity) {
            continue;
        }
        let candidate = discount.candidate_amount(base_price);
        match best {
            Some((_, amount)) if candidate <= amount => {}
            _ => best = Some((discount, candidate)),
        }
    }

    let raw_discount = best.map(|(_, amount)| amount).unwrap_or(Decimal::ZERO);
    let final_price = (base_price - raw_discount).max(Decimal::ZERO);
    let discount_amount = base_price - final_price;

    let tax_rate = product.tax_rate.unwrap_or(Decimal::ZERO);
    let tax_amount = round_currency(percent_of(final_price, tax_rate));

    PriceBreakdown {
        base_price,
        discount_amount,
        final_price,
        tax_amount,
        total_price: final_price + tax_amount,
        applied_discount: best.map(|(discount, _)| discount.clone()),
    }
}

/// Discount on a line gross, clamped to `[0, gross]` and rounded.
///
/// Same candidate rule as the catalog engine, applied to a quotation line.
pub fn discount_amount(gross: Decimal, discount_type: DiscountType, value: Decimal) -> Decimal {
    let candidate = discount_type.candidate(gross, value);
    round_currency(candidate.clamp(Decimal::ZERO, gross.max(Decimal::ZERO)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::ProductId;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn product(base: Decimal) -> CatalogProduct {
        CatalogProduct::new(ProductId::new(), "Course licence", base)
    }

    #[test]
    fn no_discounts_returns_base_price() {
        let p = product(dec!(80)).with_tax_rate(dec!(20));
        let price = effective_price(&p, 1, today());

        assert_eq!(price.discount_amount, Decimal::ZERO);
        assert_eq!(price.final_price, dec!(80));
        assert_eq!(price.tax_amount, dec!(16.00));
        assert_eq!(price.total_price, dec!(96.00));
        assert!(price.applied_discount.is_none());
    }

    #[test]
    fn min_quantity_discount_does_not_apply_below_bound() {
        let p = product(dec!(100)).with_discount(
            ProductDiscount::new("bulk", DiscountType::Percentage, dec!(10))
                .with_quantity_bounds(Some(5), None),
        );

        let price = effective_price(&p, 3, today());
        assert_eq!(price.final_price, dec!(100));
        assert_eq!(price.discount_amount, Decimal::ZERO);
        assert!(price.applied_discount.is_none());

        let price = effective_price(&p, 5, today());
        assert_eq!(price.final_price, dec!(90));
    }

    #[test]
    fn largest_applicable_discount_wins_without_stacking() {
        let p = product(dec!(200))
            .with_discount(ProductDiscount::new("ten pct", DiscountType::Percentage, dec!(10)))
            .with_discount(ProductDiscount::new("flat 25", DiscountType::FixedAmount, dec!(25)))
            .with_discount(ProductDiscount::new("five pct", DiscountType::Percentage, dec!(5)));

        let price = effective_price(&p, 1, today());
        assert_eq!(price.discount_amount, dec!(25));
        assert_eq!(price.final_price, dec!(175));
        assert_eq!(price.applied_discount.unwrap().name, "flat 25");
    }

    #[test]
    fn ties_keep_first_discount() {
        let p = product(dec!(100))
            .with_discount(ProductDiscount::new("first", DiscountType::Percentage, dec!(10)))
            .with_discount(ProductDiscount::new("second", DiscountType::FixedAmount, dec!(10)));

        let price = effective_price(&p, 1, today());
        assert_eq!(price.applied_discount.unwrap().name, "first");
    }

    #[test]
    fn expired_and_inactive_discounts_are_ignored() {
        let yesterday = today().pred_opt().unwrap();
        let p = product(dec!(100))
            .with_discount(
                ProductDiscount::new("expired", DiscountType::Percentage, dec!(50))
                    .with_active_window(None, Some(yesterday)),
            )
            .with_discount(
                ProductDiscount::new("disabled", DiscountType::Percentage, dec!(40)).deactivated(),
            );

        let price = effective_price(&p, 1, today());
        assert_eq!(price.final_price, dec!(100));
    }

    #[test]
    fn oversized_fixed_discount_clamps_final_price_to_zero() {
        let p = product(dec!(30))
            .with_tax_rate(dec!(20))
            .with_discount(ProductDiscount::new("giveaway", DiscountType::FixedAmount, dec!(50)));

        let price = effective_price(&p, 1, today());
        assert_eq!(price.final_price, Decimal::ZERO);
        assert_eq!(price.discount_amount, dec!(30));
        assert_eq!(price.tax_amount, Decimal::ZERO);
        assert_eq!(price.total_price, Decimal::ZERO);
    }

    #[test]
    fn tax_is_rounded_half_up() {
        let p = product(dec!(10.05)).with_tax_rate(dec!(10));
        // 10.05 * 10% = 1.005 -> 1.01
        let price = effective_price(&p, 1, today());
        assert_eq!(price.tax_amount, dec!(1.01));
        assert_eq!(price.total_price, dec!(11.06));
    }

    #[test]
    fn line_discount_is_clamped_to_gross() {
        assert_eq!(discount_amount(dec!(200), DiscountType::Percentage, dec!(5)), dec!(10.00));
        assert_eq!(discount_amount(dec!(40), DiscountType::FixedAmount, dec!(75)), dec!(40));
        assert_eq!(discount_amount(dec!(40), DiscountType::FixedAmount, dec!(-3)), Decimal::ZERO);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn discount_strategy() -> impl Strategy<Value = ProductDiscount> {
            (
                prop::bool::ANY,
                0i64..=150_00,
                prop::option::of(1i64..20),
                prop::option::of(1i64..20),
                prop::bool::ANY,
            )
                .prop_map(|(pct, cents, min, max, active)| {
                    let (kind, value) = if pct {
                        (DiscountType::Percentage, Decimal::new(cents % 100_00, 2))
                    } else {
                        (DiscountType::FixedAmount, Decimal::new(cents, 2))
                    };
                    let mut d = ProductDiscount::new("generated", kind, value)
                        .with_quantity_bounds(min, max);
                    d.is_active = active;
                    d
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: total >= final >= 0 for any catalog state.
            #[test]
            fn totals_are_ordered_and_non_negative(
                base_cents in 0i64..=1_000_000,
                tax in prop::option::of(0i64..=30),
                discounts in prop::collection::vec(discount_strategy(), 0..6),
                quantity in 1i64..30,
            ) {
                let mut p = product(Decimal::new(base_cents, 2));
                p.tax_rate = tax.map(Decimal::from);
                p.discounts = discounts;

                let price = effective_price(&p, quantity, today());
                prop_assert!(price.final_price >= Decimal::ZERO);
                prop_assert!(price.total_price >= price.final_price);
                prop_assert_eq!(price.base_price - price.discount_amount, price.final_price);
            }

            /// Property: the applied discount is always eligible and the largest eligible one.
            #[test]
            fn applied_discount_is_best_eligible(
                base_cents in 1i64..=1_000_000,
                discounts in prop::collection::vec(discount_strategy(), 0..6),
                quantity in 1i64..30,
            ) {
                let mut p = product(Decimal::new(base_cents, 2));
                p.discounts = discounts;

                let price = effective_price(&p, quantity, today());
                let eligible: Vec<&ProductDiscount> = p
                    .discounts
                    .iter()
                    .filter(|d| d.is_active_on(today()) && d.applies_to_quantity(quantity))
                    .collect();

                match &price.applied_discount {
                    None => prop_assert!(eligible.is_empty()),
                    Some(applied) => {
                        prop_assert!(applied.is_active_on(today()));
                        prop_assert!(applied.applies_to_quantity(quantity));
                        let best = applied.candidate_amount(p.base_price);
                        for d in eligible {
                            prop_assert!(d.candidate_amount(p.base_price) <= best);
                        }
                    }
                }
            }
        }
    }
}
