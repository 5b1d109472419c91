//! Currency codes and amount formatting

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::CurrencyParseError;

/// Currency used when none is configured
pub const DEFAULT_CURRENCY: &str = "INR";

/// Number of decimal places kept on computed amounts
pub const AMOUNT_SCALE: u32 = 2;

/// Three-letter currency code, always upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse and normalize a currency code
    pub fn new(code: &str) -> Result<Self, CurrencyParseError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(CurrencyParseError(code.to_string()))
        }
    }

    /// Get the currency code
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(DEFAULT_CURRENCY.to_string())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Currency {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Round an amount to two decimals, midpoint away from zero
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for display, e.g. `INR 225.00`
pub fn format_amount(amount: Decimal, currency: &Currency) -> String {
    format!("{currency} {:.2}", round_amount(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_normalizes_case() {
        let currency: Currency = "inr".parse().unwrap();
        assert_eq!(currency.as_str(), "INR");
        assert_eq!(currency, Currency::default());
    }

    #[test]
    fn test_currency_rejects_bad_codes() {
        assert!(Currency::new("").is_err());
        assert!(Currency::new("RUPEE").is_err());
        assert!(Currency::new("U$D").is_err());
    }

    #[test]
    fn test_currency_serde_rejects_bad_code() {
        assert!(serde_json::from_str::<Currency>("\"usd\"").is_ok());
        assert!(serde_json::from_str::<Currency>("\"dollars\"").is_err());
    }

    #[test]
    fn test_round_amount_midpoint_away_from_zero() {
        assert_eq!(round_amount(dec!(22.505)), dec!(22.51));
        assert_eq!(round_amount(dec!(1.666666)), dec!(1.67));
        assert_eq!(round_amount(dec!(225)), dec!(225));
    }

    #[test]
    fn test_format_amount_two_decimals() {
        let inr = Currency::default();
        assert_eq!(format_amount(dec!(225), &inr), "INR 225.00");
        assert_eq!(format_amount(dec!(72.5), &inr), "INR 72.50");
        assert_eq!(format_amount(dec!(2.5), &inr), "INR 2.50");
    }
}
