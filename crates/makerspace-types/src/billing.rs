//! Cost estimate and reservation billing records
//!
//! Both are derived per reservation attempt and never persisted here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, EquipmentId};

/// Estimated charge for a planned reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Equipment being reserved
    pub equipment_id: EquipmentId,
    /// Currency of every amount
    pub currency: Currency,
    /// Requested duration
    pub duration_minutes: u32,
    /// Duration after the grace period
    pub chargeable_minutes: u32,
    /// Minutes actually billed (after the minimum)
    pub billed_minutes: u32,
    /// Price of one minute
    pub rate_per_minute: Decimal,
    /// `billed_minutes × rate_per_minute`
    pub base_cost: Decimal,
    /// Amount the member will be charged
    pub estimated_total: Decimal,
    /// Whether the daily cap clamped the total
    pub daily_cap_reached: bool,
    /// Human-readable breakdown
    pub breakdown: Vec<String>,
}

/// Final charge once actual usage is known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationBilling {
    /// Equipment that was used
    pub equipment_id: EquipmentId,
    /// Currency of every amount
    pub currency: Currency,
    /// Reserved duration
    pub planned_minutes: u32,
    /// Actual duration
    pub actual_minutes: u32,
    /// Minutes billed for the actual duration
    pub billed_minutes: u32,
    /// Cost of the actual duration before penalties
    pub base_cost: Decimal,
    /// Minutes past the reserved duration
    pub overuse_minutes: u32,
    /// Penalty for running over
    pub overuse_penalty: Decimal,
    /// `base_cost + overuse_penalty`, before the daily cap
    pub subtotal: Decimal,
    /// Amount charged after the daily cap
    pub total: Decimal,
    /// Whether the daily cap clamped the total
    pub daily_cap_reached: bool,
    /// Human-readable breakdown
    pub breakdown: Vec<String>,
}

/// A charge against a member's running total for one equipment and day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCharge {
    /// Total already charged that day before this charge
    pub prior: Decimal,
    /// Amount charged after the cap
    pub charged: Decimal,
    /// Whether the cap clamped the amount
    pub cap_reached: bool,
}

impl DailyCharge {
    /// Clamp `amount` so `prior + charged` never exceeds `cap`
    ///
    /// The cap is reached only when `prior + amount` is strictly above it;
    /// the clamped amount is floored at zero.
    pub fn apply(cap: Option<Decimal>, prior: Decimal, amount: Decimal) -> Self {
        match cap {
            Some(cap) if prior + amount > cap => Self {
                prior,
                charged: (cap - prior).max(Decimal::ZERO),
                cap_reached: true,
            },
            _ => Self {
                prior,
                charged: amount,
                cap_reached: false,
            },
        }
    }

    /// Day total after this charge
    pub fn day_total(&self) -> Decimal {
        self.prior + self.charged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_daily_charge_without_cap() {
        let charge = DailyCharge::apply(None, dec!(1000), dec!(50));
        assert_eq!(charge.charged, dec!(50));
        assert_eq!(charge.day_total(), dec!(1050));
        assert!(!charge.cap_reached);
    }

    #[test]
    fn test_daily_charge_clamps_to_cap() {
        let charge = DailyCharge::apply(Some(dec!(500)), dec!(400), dec!(225));
        assert_eq!(charge.charged, dec!(100));
        assert_eq!(charge.day_total(), dec!(500));
        assert!(charge.cap_reached);
    }

    #[test]
    fn test_daily_charge_exactly_at_cap() {
        let charge = DailyCharge::apply(Some(dec!(500)), dec!(275), dec!(225));
        assert_eq!(charge.charged, dec!(225));
        assert!(!charge.cap_reached);
    }

    #[test]
    fn test_daily_charge_floors_at_zero() {
        let charge = DailyCharge::apply(Some(dec!(500)), dec!(650), dec!(75));
        assert_eq!(charge.charged, Decimal::ZERO);
        assert!(charge.cap_reached);
    }
}
