//! Cost estimation for planned reservations

use rust_decimal::Decimal;

use makerspace_types::{
    format_amount, CostEstimate, DailyCharge, EquipmentAccessPolicy, PayPerUsePricing,
};

/// Minutes left after the grace period and the minimum are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BilledMinutes {
    pub chargeable: u32,
    pub billed: u32,
}

impl BilledMinutes {
    pub(crate) fn compute(pricing: &PayPerUsePricing, duration_minutes: u32) -> Self {
        let chargeable = duration_minutes.saturating_sub(pricing.grace_period_minutes);
        let billed = chargeable.max(pricing.minimum_billing_minutes);
        Self { chargeable, billed }
    }
}

/// Breakdown lines shared by the estimate and the final bill
pub(crate) fn duration_lines(
    pricing: &PayPerUsePricing,
    duration_minutes: u32,
    minutes: BilledMinutes,
    base_cost: Decimal,
) -> Vec<String> {
    let currency = &pricing.currency;
    let mut lines = vec![format!("Duration: {duration_minutes} min")];
    if pricing.grace_period_minutes > 0 {
        lines.push(format!(
            "Grace period: {} min free ({} min chargeable)",
            pricing.grace_period_minutes, minutes.chargeable
        ));
    }
    if minutes.billed > minutes.chargeable {
        lines.push(format!(
            "Minimum billing time: {} min",
            pricing.minimum_billing_minutes
        ));
    }
    lines.push(format!(
        "Rate: {} per {}",
        format_amount(pricing.price_per_unit, currency),
        pricing.cost_unit
    ));
    lines.push(format!(
        "Base cost: {} min = {}",
        minutes.billed,
        format_amount(base_cost, currency)
    ));
    lines
}

/// Breakdown line for a cap hit
pub(crate) fn cap_line(pricing: &PayPerUsePricing, usage_so_far: Decimal) -> Option<String> {
    pricing.max_daily_cap.map(|cap| {
        format!(
            "Daily cap of {} reached ({} already charged today)",
            format_amount(cap, &pricing.currency),
            format_amount(usage_so_far, &pricing.currency)
        )
    })
}

/// Estimate the charge for reserving `duration_minutes`
///
/// Returns `None` when the equipment is not pay-per-use.
pub fn estimate_cost(
    policy: &EquipmentAccessPolicy,
    duration_minutes: u32,
    daily_usage_so_far: Decimal,
) -> Option<CostEstimate> {
    let pricing = policy.pricing()?;

    let minutes = BilledMinutes::compute(pricing, duration_minutes);
    let base_cost = pricing.cost_for_minutes(minutes.billed);
    let capped = DailyCharge::apply(pricing.max_daily_cap, daily_usage_so_far, base_cost);

    let mut breakdown = duration_lines(pricing, duration_minutes, minutes, base_cost);
    if capped.cap_reached {
        breakdown.extend(cap_line(pricing, daily_usage_so_far));
    }
    breakdown.push(format!(
        "Estimated total: {}",
        format_amount(capped.charged, &pricing.currency)
    ));

    Some(CostEstimate {
        equipment_id: policy.equipment_id.clone(),
        currency: pricing.currency.clone(),
        duration_minutes,
        chargeable_minutes: minutes.chargeable,
        billed_minutes: minutes.billed,
        rate_per_minute: pricing.rate_per_minute(),
        base_cost,
        estimated_total: capped.charged,
        daily_cap_reached: capped.cap_reached,
        breakdown,
    })
}
