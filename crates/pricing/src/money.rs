use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit precision for every currency handled by the marketplace.
pub const CURRENCY_SCALE: u32 = 2;

/// Round half-up (midpoint away from zero) to currency precision.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × rate / 100`, unrounded.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}

/// Line total: `unit_price × quantity − discount`.
pub fn line_total(unit_price: Decimal, quantity: i64, discount: Decimal) -> Decimal {
    unit_price * Decimal::from(quantity) - discount
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_currency(dec!(10.005)), dec!(10.01));
        assert_eq!(round_currency(dec!(10.004)), dec!(10.00));
        assert_eq!(round_currency(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn line_total_subtracts_discount_once() {
        assert_eq!(line_total(dec!(100), 2, dec!(10)), dec!(190));
        assert_eq!(line_total(dec!(12.50), 4, Decimal::ZERO), dec!(50.00));
    }

    #[test]
    fn percent_of_is_exact() {
        assert_eq!(percent_of(dec!(240), dec!(20)), dec!(48));
        assert_eq!(percent_of(dec!(19.99), dec!(7.5)), dec!(1.49925));
    }
}
