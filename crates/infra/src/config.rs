//! Procurement settings read from the environment.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

pub const DEFAULT_TAX_RATE_VAR: &str = "PROCURA_DEFAULT_TAX_RATE";
pub const DEFAULT_CURRENCY_VAR: &str = "PROCURA_DEFAULT_CURRENCY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid tax rate {value:?} (expected a percentage between 0 and 100)")]
    InvalidTaxRate { var: &'static str, value: String },
    #[error("{var}: invalid currency {value:?} (expected a 3-letter uppercase code)")]
    InvalidCurrency { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcurementConfig {
    /// Percent applied to orders whose first line has no product tax rate.
    pub default_tax_rate: Decimal,
    /// Currency for quotations that do not name one.
    pub default_currency: String,
}

impl Default for ProcurementConfig {
    fn default() -> Self {
        Self {
            default_tax_rate: Decimal::from(20),
            default_currency: "USD".to_string(),
        }
    }
}

impl ProcurementConfig {
    /// Read settings from the process environment.
    ///
    /// Missing variables use the defaults; invalid ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ProcurementConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_tax_rate = match lookup(DEFAULT_TAX_RATE_VAR).map(|raw| parse_tax_rate(&raw)) {
            Some(Ok(rate)) => rate,
            Some(Err(err)) => {
                tracing::warn!(error = %err, fallback = %defaults.default_tax_rate, "ignoring invalid configuration");
                defaults.default_tax_rate
            }
            None => defaults.default_tax_rate,
        };

        let default_currency = match lookup(DEFAULT_CURRENCY_VAR).map(|raw| parse_currency(&raw)) {
            Some(Ok(code)) => code,
            Some(Err(err)) => {
                tracing::warn!(error = %err, fallback = %defaults.default_currency, "ignoring invalid configuration");
                defaults.default_currency
            }
            None => defaults.default_currency,
        };

        Self {
            default_tax_rate,
            default_currency,
        }
    }
}

fn parse_tax_rate(raw: &str) -> Result<Decimal, ConfigError> {
    let invalid = || ConfigError::InvalidTaxRate {
        var: DEFAULT_TAX_RATE_VAR,
        value: raw.to_string(),
    };
    let rate = Decimal::from_str(raw.trim()).map_err(|_| invalid())?;
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(invalid());
    }
    Ok(rate)
}

fn parse_currency(raw: &str) -> Result<String, ConfigError> {
    let code = raw.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code.to_string())
    } else {
        Err(ConfigError::InvalidCurrency {
            var: DEFAULT_CURRENCY_VAR,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ProcurementConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, ProcurementConfig::default());
        assert_eq!(cfg.default_tax_rate, dec!(20));
    }

    #[test]
    fn reads_valid_values() {
        let cfg = ProcurementConfig::from_lookup(lookup(&[
            (DEFAULT_TAX_RATE_VAR, "7.5"),
            (DEFAULT_CURRENCY_VAR, "EUR"),
        ]));
        assert_eq!(cfg.default_tax_rate, dec!(7.5));
        assert_eq!(cfg.default_currency, "EUR");
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = ProcurementConfig::from_lookup(lookup(&[
            (DEFAULT_TAX_RATE_VAR, "150"),
            (DEFAULT_CURRENCY_VAR, "euro"),
        ]));
        assert_eq!(cfg, ProcurementConfig::default());
        assert!(matches!(
            parse_tax_rate("abc"),
            Err(ConfigError::InvalidTaxRate { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_rate_within_bounds_is_accepted(cents in 0i64..=10_000) {
            let rate = Decimal::new(cents, 2);
            let raw = rate.to_string();
            let cfg = ProcurementConfig::from_lookup(lookup(&[(DEFAULT_TAX_RATE_VAR, raw.as_str())]));
            prop_assert_eq!(cfg.default_tax_rate, rate);
        }
    }
}
