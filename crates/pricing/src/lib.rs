//! Pricing engine: effective unit prices, discounts and tax arithmetic.
//!
//! Pure functions over catalog state; the caller supplies "today" so the
//! same inputs always price the same way.

pub mod catalog;
pub mod discount;
pub mod engine;
pub mod money;

pub use catalog::CatalogProduct;
pub use discount::{DiscountType, ProductDiscount};
pub use engine::{PriceBreakdown, discount_amount, effective_price};
pub use money::{CURRENCY_SCALE, line_total, percent_of, round_currency};
