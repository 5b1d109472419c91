//! Final billing once actual usage is known

use rust_decimal::Decimal;

use makerspace_types::{
    format_amount, round_amount, DailyCharge, EquipmentAccessPolicy, PayPerUsePricing,
    ReservationBilling,
};

use crate::estimator::{cap_line, duration_lines, BilledMinutes};

/// Penalty for running `overuse_minutes` past the reservation
///
/// Flat and percentage components are additive; the percentage applies to
/// the base cost of the actual duration.
fn overuse_penalty(
    pricing: &PayPerUsePricing,
    overuse_minutes: u32,
    base_cost: Decimal,
) -> Decimal {
    if overuse_minutes == 0 {
        return Decimal::ZERO;
    }
    let flat = pricing.overuse_penalty_flat.unwrap_or(Decimal::ZERO);
    let percent = pricing
        .overuse_penalty_percent
        .map_or(Decimal::ZERO, |pct| base_cost * pct / Decimal::ONE_HUNDRED);
    round_amount(flat + percent)
}

/// Compute the final charge for a completed reservation
///
/// The base cost uses `actual_minutes`. The daily cap is applied after the
/// overuse penalty. Returns `None` when the equipment is not pay-per-use.
pub fn calculate_final_billing(
    policy: &EquipmentAccessPolicy,
    planned_minutes: u32,
    actual_minutes: u32,
    daily_usage_so_far: Decimal,
) -> Option<ReservationBilling> {
    let pricing = policy.pricing()?;
    let currency = &pricing.currency;

    let minutes = BilledMinutes::compute(pricing, actual_minutes);
    let base_cost = pricing.cost_for_minutes(minutes.billed);
    let overuse_minutes = actual_minutes.saturating_sub(planned_minutes);
    let penalty = overuse_penalty(pricing, overuse_minutes, base_cost);
    let subtotal = base_cost + penalty;
    let capped = DailyCharge::apply(pricing.max_daily_cap, daily_usage_so_far, subtotal);

    let mut breakdown = duration_lines(pricing, actual_minutes, minutes, base_cost);
    if overuse_minutes > 0 {
        breakdown.push(format!(
            "Overuse: {overuse_minutes} min past the reserved {planned_minutes} min, penalty {}",
            format_amount(penalty, currency)
        ));
    }
    if capped.cap_reached {
        breakdown.extend(cap_line(pricing, daily_usage_so_far));
    }
    breakdown.push(format!("Total: {}", format_amount(capped.charged, currency)));

    Some(ReservationBilling {
        equipment_id: policy.equipment_id.clone(),
        currency: currency.clone(),
        planned_minutes,
        actual_minutes,
        billed_minutes: minutes.billed,
        base_cost,
        overuse_minutes,
        overuse_penalty: penalty,
        subtotal,
        total: capped.charged,
        daily_cap_reached: capped.cap_reached,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use makerspace_types::CostUnit;
    use rust_decimal_macros::dec;

    fn laser_cutter(flat: Option<Decimal>, percent: Option<Decimal>) -> EquipmentAccessPolicy {
        EquipmentAccessPolicy::pay_per_use(
            "laser-cutter-1",
            PayPerUsePricing::new(dec!(150), CostUnit::Hour)
                .with_minimum_billing(15)
                .with_overuse_penalty(flat, percent),
        )
    }

    #[test]
    fn test_overuse_penalty_is_additive() {
        let policy = laser_cutter(Some(dec!(50)), Some(dec!(10)));
        let billing = calculate_final_billing(&policy, 60, 90, Decimal::ZERO).unwrap();
        assert_eq!(billing.base_cost, dec!(225.00));
        assert_eq!(billing.overuse_minutes, 30);
        assert_eq!(billing.overuse_penalty, dec!(72.50));
        assert_eq!(billing.subtotal, dec!(297.50));
        assert_eq!(billing.total, dec!(297.50));
        assert!(!billing.daily_cap_reached);
    }

    #[test]
    fn test_on_time_has_no_penalty() {
        let policy = laser_cutter(Some(dec!(50)), Some(dec!(10)));
        let billing = calculate_final_billing(&policy, 90, 90, Decimal::ZERO).unwrap();
        assert_eq!(billing.overuse_minutes, 0);
        assert_eq!(billing.overuse_penalty, Decimal::ZERO);
        assert_eq!(billing.total, dec!(225.00));
        assert!(!billing.breakdown.iter().any(|l| l.starts_with("Overuse")));
    }

    #[test]
    fn test_early_finish_bills_actual_duration() {
        let policy = laser_cutter(Some(dec!(50)), None);
        let billing = calculate_final_billing(&policy, 90, 30, Decimal::ZERO).unwrap();
        assert_eq!(billing.overuse_minutes, 0);
        assert_eq!(billing.billed_minutes, 30);
        assert_eq!(billing.total, dec!(75.00));
    }

    #[test]
    fn test_flat_only_and_percent_only() {
        let bill = |flat, percent| {
            calculate_final_billing(&laser_cutter(flat, percent), 60, 90, Decimal::ZERO).unwrap()
        };

        assert_eq!(bill(Some(dec!(50)), None).overuse_penalty, dec!(50));
        assert_eq!(bill(None, Some(dec!(10))).overuse_penalty, dec!(22.50));

        let neither = bill(None, None);
        assert_eq!(neither.overuse_penalty, Decimal::ZERO);
        assert_eq!(neither.total, dec!(225.00));
    }

    #[test]
    fn test_cap_applies_after_penalty() {
        let policy = EquipmentAccessPolicy::pay_per_use(
            "laser-cutter-1",
            PayPerUsePricing::new(dec!(150), CostUnit::Hour)
                .with_daily_cap(dec!(500))
                .with_overuse_penalty(Some(dec!(50)), Some(dec!(10))),
        );
        // 225 + 72.50 = 297.50 pushes 250 already charged past 500
        let billing = calculate_final_billing(&policy, 60, 90, dec!(250)).unwrap();
        assert_eq!(billing.subtotal, dec!(297.50));
        assert_eq!(billing.total, dec!(250));
        assert!(billing.daily_cap_reached);
        assert_eq!(billing.breakdown.last().map(String::as_str), Some("Total: INR 250.00"));
    }

    #[test]
    fn test_largest_valid_policy_does_not_overflow() {
        use makerspace_types::{MAX_PENALTY_PERCENT, MAX_POLICY_AMOUNT};

        let policy = EquipmentAccessPolicy::pay_per_use(
            "laser-cutter-1",
            PayPerUsePricing::new(MAX_POLICY_AMOUNT, CostUnit::Minute)
                .with_daily_cap(MAX_POLICY_AMOUNT)
                .with_overuse_penalty(Some(MAX_POLICY_AMOUNT), Some(MAX_PENALTY_PERCENT)),
        );
        policy.validate().unwrap();

        let billing = calculate_final_billing(&policy, 1, u32::MAX, MAX_POLICY_AMOUNT).unwrap();
        assert_eq!(billing.total, Decimal::ZERO);
        assert!(billing.daily_cap_reached);
        assert!(billing.subtotal > billing.base_cost);

        let estimate = crate::estimate_cost(&policy, u32::MAX, Decimal::ZERO).unwrap();
        assert_eq!(estimate.estimated_total, MAX_POLICY_AMOUNT);
    }

    #[test]
    fn test_not_applicable_for_unmetered_policies() {
        let policy = EquipmentAccessPolicy::subscription_only("woodshop");
        assert!(calculate_final_billing(&policy, 60, 120, Decimal::ZERO).is_none());
    }
}
