//! Access checks for reservations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use makerspace_types::{
    format_amount, AccessCheckResult, AccessRule, EquipmentAccessPolicy, PayPerUsePricing,
    RequiredAction, UserSubscription, UserWallet,
};

/// Decide whether a member may reserve the equipment
///
/// | access type         | allowed when                                        |
/// |---------------------|-----------------------------------------------------|
/// | `free`              | always                                              |
/// | `subscription_only` | membership not required, or subscription active     |
/// | `pay_per_use`       | membership satisfied and wallet covers the estimate |
///
/// A missing wallet counts as a zero balance and a missing estimate as a zero
/// cost. Purely advisory; nothing is reserved or charged.
pub fn check_access(
    policy: &EquipmentAccessPolicy,
    subscription: Option<&UserSubscription>,
    wallet: Option<&UserWallet>,
    estimated_cost: Option<Decimal>,
    as_of: DateTime<Utc>,
) -> AccessCheckResult {
    let has_active_subscription = subscription.is_some_and(|s| s.is_active_at(as_of));

    match &policy.rule {
        AccessRule::Free => AccessCheckResult::allowed(),
        AccessRule::SubscriptionOnly => {
            if !policy.membership_required || has_active_subscription {
                AccessCheckResult::allowed()
            } else {
                AccessCheckResult::denied(
                    RequiredAction::UpgradeSubscription,
                    format!(
                        "An active subscription is required to use {}",
                        policy.equipment_id
                    ),
                )
            }
        }
        AccessRule::PayPerUse(pricing) => {
            if policy.membership_required && !has_active_subscription {
                return AccessCheckResult::denied(
                    RequiredAction::UpgradeSubscription,
                    format!("Membership is required to use {}", policy.equipment_id),
                );
            }
            check_funds(pricing, wallet, estimated_cost.unwrap_or(Decimal::ZERO))
        }
    }
}

fn check_funds(
    pricing: &PayPerUsePricing,
    wallet: Option<&UserWallet>,
    required: Decimal,
) -> AccessCheckResult {
    if required <= Decimal::ZERO {
        return AccessCheckResult::allowed();
    }

    let currency = &pricing.currency;
    match wallet {
        Some(wallet) if wallet.covers(required, currency) => AccessCheckResult::allowed(),
        Some(wallet) if wallet.currency() != currency => AccessCheckResult::denied(
            RequiredAction::AddFunds,
            format!(
                "Wallet is in {} but this equipment is billed in {currency}",
                wallet.currency()
            ),
        ),
        Some(wallet) => AccessCheckResult::denied(
            RequiredAction::AddFunds,
            format!(
                "Insufficient wallet balance: {} available, {} required",
                format_amount(wallet.balance(), currency),
                format_amount(required, currency)
            ),
        ),
        None => AccessCheckResult::denied(
            RequiredAction::AddFunds,
            format!("No wallet found; {} required", format_amount(required, currency)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use makerspace_types::{CostUnit, Currency, SubscriptionStatus, UserId};
    use rust_decimal_macros::dec;

    fn subscription(status: SubscriptionStatus) -> UserSubscription {
        let now = Utc::now();
        UserSubscription {
            user_id: UserId::new(),
            plan_name: "Maker Monthly".to_string(),
            status,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(29),
            included_equipment_types: Default::default(),
        }
    }

    fn wallet(balance: Decimal) -> UserWallet {
        UserWallet::new(UserId::new(), balance, Currency::default()).unwrap()
    }

    fn metered(membership_required: bool) -> EquipmentAccessPolicy {
        EquipmentAccessPolicy::pay_per_use(
            "laser-cutter-1",
            PayPerUsePricing::new(dec!(150), CostUnit::Hour),
        )
        .with_membership_required(membership_required)
    }

    #[test]
    fn test_free_always_allowed() {
        let policy = EquipmentAccessPolicy::free("hand-tools").with_membership_required(true);
        let result = check_access(&policy, None, None, Some(dec!(1000)), Utc::now());
        assert_eq!(result, AccessCheckResult::allowed());
    }

    #[test]
    fn test_subscription_only_without_membership_requirement() {
        let policy = EquipmentAccessPolicy::subscription_only("woodshop");
        assert!(check_access(&policy, None, None, None, Utc::now()).allowed);
    }

    #[test]
    fn test_subscription_only_requires_active_subscription() {
        let policy =
            EquipmentAccessPolicy::subscription_only("woodshop").with_membership_required(true);

        let active = subscription(SubscriptionStatus::Active);
        assert!(check_access(&policy, Some(&active), None, None, Utc::now()).allowed);

        let expired = subscription(SubscriptionStatus::Expired);
        let result = check_access(&policy, Some(&expired), None, None, Utc::now());
        assert!(!result.allowed);
        assert_eq!(
            result.required_action,
            Some(RequiredAction::UpgradeSubscription)
        );

        let result = check_access(&policy, None, None, None, Utc::now());
        assert_eq!(
            result.required_action,
            Some(RequiredAction::UpgradeSubscription)
        );
    }

    #[test]
    fn test_active_status_outside_period_is_not_active() {
        let policy =
            EquipmentAccessPolicy::subscription_only("woodshop").with_membership_required(true);
        let sub = subscription(SubscriptionStatus::Active);
        let after_end = sub.end_date + Duration::days(1);
        let result = check_access(&policy, Some(&sub), None, None, after_end);
        assert!(!result.allowed);
    }

    #[test]
    fn test_pay_per_use_membership_checked_before_funds() {
        let result = check_access(
            &metered(true),
            None,
            Some(&wallet(dec!(1000))),
            Some(dec!(225)),
            Utc::now(),
        );
        assert!(!result.allowed);
        assert_eq!(
            result.required_action,
            Some(RequiredAction::UpgradeSubscription)
        );
    }

    #[test]
    fn test_pay_per_use_insufficient_funds() {
        let active = subscription(SubscriptionStatus::Active);
        let result = check_access(
            &metered(true),
            Some(&active),
            Some(&wallet(dec!(100))),
            Some(dec!(225)),
            Utc::now(),
        );
        assert!(!result.allowed);
        assert_eq!(result.required_action, Some(RequiredAction::AddFunds));
        assert_eq!(
            result.reason.as_deref(),
            Some("Insufficient wallet balance: INR 100.00 available, INR 225.00 required")
        );
    }

    #[test]
    fn test_pay_per_use_exact_balance_allowed() {
        let result = check_access(
            &metered(false),
            None,
            Some(&wallet(dec!(225))),
            Some(dec!(225)),
            Utc::now(),
        );
        assert_eq!(result, AccessCheckResult::allowed());
    }

    #[test]
    fn test_pay_per_use_missing_wallet() {
        let result = check_access(&metered(false), None, None, Some(dec!(10)), Utc::now());
        assert_eq!(result.required_action, Some(RequiredAction::AddFunds));

        // Nothing to pay means nothing to cover
        let result = check_access(&metered(false), None, None, None, Utc::now());
        assert!(result.allowed);
    }

    #[test]
    fn test_pay_per_use_wallet_in_other_currency() {
        let usd = Currency::new("USD").unwrap();
        let usd = UserWallet::new(UserId::new(), dec!(1000), usd).unwrap();
        let result = check_access(&metered(false), None, Some(&usd), Some(dec!(5)), Utc::now());
        assert!(!result.allowed);
        assert_eq!(result.required_action, Some(RequiredAction::AddFunds));
    }
}
