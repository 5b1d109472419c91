//! Billing configuration

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use makerspace_types::Currency;

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Currency every policy must be priced in
    pub currency: Currency,
    /// Offset used to decide which day a charge belongs to
    pub utc_offset: FixedOffset,
}

impl BillingConfig {
    /// Create a config billing in `currency`, with usage days in UTC
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            utc_offset: Utc.fix(),
        }
    }

    /// Set the offset used for usage days
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Local day that `at` falls on
    pub fn usage_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset).date_naive()
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}
